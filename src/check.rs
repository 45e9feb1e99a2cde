use crate::DocState;

impl DocState {
    /// Check the internal state of the document. This is only exported for integration testing.
    /// You shouldn't have any reason to call this method.
    ///
    /// With `deep` set, this also replays the entire log from scratch and compares the result.
    #[allow(unused)]
    pub fn dbg_check(&self, deep: bool) {
        self.dels().dbg_check();

        let allocated = self.allocated();
        assert_eq!(self.len_chars() as u64, allocated - self.dels().len() as u64);
        if let Some(last) = self.dels().iter().last() {
            assert!(last < allocated);
        }

        for &p in self.points() {
            assert!(p as usize <= self.len_chars());
        }

        let ops = self.ops();
        let inserts = ops.iter().filter(|op| op.is_insert()).count();
        assert_eq!(inserts as u64, allocated);

        if deep {
            for (pos, op) in ops.iter().enumerate() {
                assert_eq!(self.position_of(op.id()), Some(pos));
            }

            let replayed = DocState::from_ops(ops.iter().copied());
            assert_eq!(replayed.content(), self.content());
            assert_eq!(replayed.dels(), self.dels());
        }
    }
}
