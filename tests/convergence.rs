use std::collections::BTreeSet;
use rand::prelude::*;
use tombstone_ot::*;

fn ins(index: u64, ch: char, priority: i64, id: u64) -> Operation {
    Operation::new_insert(index, ch, priority, id)
}

#[test]
fn two_peers_type_at_start() {
    let mut doc = DocState::new();
    let mut a = Peer::new();
    let mut b = Peer::new();

    a.merge_op(&mut doc, ins(0, 'a', 0, 1)).unwrap();
    assert_eq!(doc.text(), "a");

    // B hadn't seen A's insert. Its priority is higher so it lands after.
    assert_eq!(b.merge_op(&mut doc, ins(0, 'b', 1, 2)), Ok(MergeOutcome::Appended(1)));
    assert_eq!(doc.ops()[1].index(), 1);
    assert_eq!(doc.text(), "ab");
}

#[test]
fn delete_then_insert_into_gap() {
    let mut seq = Sequencer::default();
    let p = seq.connect();
    seq.receive(p, &[ins(0, 'a', 0, 1), ins(1, 'b', 0, 2), ins(2, 'c', 0, 3)]).unwrap();
    seq.receive(p, &[Operation::new_delete(1, 4)]).unwrap();
    assert_eq!(seq.doc().text(), "ac");
    assert_eq!(seq.doc().dels().iter().collect::<Vec<_>>(), &[1]);

    seq.receive(p, &[ins(1, 'x', 0, 5)]).unwrap();
    assert_eq!(seq.doc().dels().iter().collect::<Vec<_>>(), &[2]);
    assert_eq!(seq.doc().text(), "axc");
    seq.doc().dbg_check(true);
}

#[test]
fn same_index_inserts_converge_in_any_order() {
    let ops = [ins(0, 'a', 0, 1), ins(0, 'b', 1, 2), ins(0, 'c', 2, 3)];
    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

    for order in orders {
        let mut doc = DocState::new();
        let mut peers = [Peer::new(), Peer::new(), Peer::new()];
        for i in order {
            peers[i].merge_op(&mut doc, ops[i]).unwrap();
        }
        assert_eq!(doc.text(), "abc", "arrival order {:?}", order);
    }
}

/// Pick a random operation a peer could make, given its view of the document.
fn random_op(view: &DocState, rng: &mut SmallRng, id: u64, priority: i64) -> Operation {
    if view.len_chars() == 0 || rng.gen_bool(0.6) {
        let index = rng.gen_range(0..=view.allocated());
        let ch = ['a', 'b', 'c', '\u{394}', '\u{21bb}', '\u{10190}'][rng.gen_range(0..6)];
        Operation::new_insert(index, ch, priority, id)
    } else {
        let visible = rng.gen_range(0..view.len_chars() as u64);
        Operation::new_delete(view.xform_ix(visible), id)
    }
}

struct Client {
    id: PeerId,
    /// Our view of the document is `ops[..known]`.
    known: usize,
    /// Log positions of our own operations.
    own: BTreeSet<usize>,
    priority: i64,
}

impl Client {
    /// Foreign operations in `ops[known..target]`, shuffled.
    fn acks(&self, seq: &Sequencer, target: usize, rng: &mut SmallRng) -> Vec<Operation> {
        let mut acks: Vec<Operation> = (self.known..target)
            .filter(|pos| !self.own.contains(pos))
            .map(|pos| seq.doc().ops()[pos])
            .collect();
        acks.shuffle(rng);
        acks
    }
}

fn random_session(seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut seq = Sequencer::new(SequencerConfig {
        coalesce_broadcasts: rng.gen_bool(0.5),
        ..Default::default()
    });
    let mut clients: Vec<Client> = (0..4).map(|i| Client {
        id: seq.connect(),
        known: 0,
        own: BTreeSet::new(),
        priority: i,
    }).collect();

    let mut sent: Vec<Operation> = vec![];
    let mut next_id = 0;

    for _i in 0..100 {
        let client = &mut clients[rng.gen_range(0..4)];
        let len = seq.doc().num_ops();

        // A client whose own operations aren't in its prefix yet has to catch up completely, so
        // its view stays a prefix of the log.
        let target = if client.own.range(client.known..).next().is_some() || client.known == len {
            len
        } else {
            rng.gen_range(client.known..=len)
        };

        let mut batch = client.acks(&seq, target, &mut rng);
        let view = DocState::from_ops(seq.doc().ops()[..target].iter().copied());
        batch.push(random_op(&view, &mut rng, next_id, client.priority));
        next_id += 1;

        let appended = seq.handle_update(client.id, &batch, &mut |ops: &[Operation]| sent.extend_from_slice(ops))
            .unwrap();
        assert_eq!(appended, len..len + 1);
        client.own.insert(len);

        client.known = if target == len { len + 1 } else { target };
        assert_eq!(seq.peer(client.id).map(|p| p.rev()), Some(client.known));
        seq.doc().dbg_check(false);
    }

    let len = seq.doc().num_ops();
    for client in clients.iter_mut() {
        let acks = client.acks(&seq, len, &mut rng);
        seq.receive(client.id, &acks).unwrap();
        client.known = len;

        let peer = seq.peer(client.id).unwrap();
        assert_eq!(peer.rev(), len);
        assert!(peer.context().is_empty());
    }

    seq.flush(&mut |ops: &[Operation]| sent.extend_from_slice(ops));
    assert_eq!(sent.as_slice(), seq.doc().ops());
    seq.doc().dbg_check(true);
}

#[test]
fn random_sessions() {
    for seed in 0..30 {
        random_session(seed);
    }
}
