/// Snapshot passed to a progress observer after each image is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(processed: usize, total: usize) -> Self {
        Self { processed, total }
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.processed as f64 / self.total as f64
    }

    pub fn is_done(&self) -> bool {
        self.processed >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_and_completion() {
        assert_eq!(Progress::new(1, 4).fraction(), 0.25);
        assert!(!Progress::new(1, 4).is_done());
        assert!(Progress::new(4, 4).is_done());
        assert_eq!(Progress::new(0, 0).fraction(), 1.0);
    }
}
