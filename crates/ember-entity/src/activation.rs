/// Observable active flag. Observers run synchronously on every transition and are
/// not replayed for the current value when registered.
#[derive(Default)]
pub(crate) struct Activation {
    active: bool,
    observers: Vec<Box<dyn FnMut(bool) + Send>>,
}

impl Activation {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        for observer in &mut self.observers {
            observer(active);
        }
    }

    pub fn observe(&mut self, observer: impl FnMut(bool) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn fires_only_on_transitions() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut flag = Activation::default();
        let c = count.clone();
        flag.observe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        flag.set(false);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        flag.set(true);
        flag.set(true);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        flag.set(false);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!flag.is_active());
    }
}
