use tokio::sync::watch;

/// Physical button lock switch.
#[derive(Debug)]
pub struct ChildLockControl {
    state: watch::Sender<bool>,
}

impl Default for ChildLockControl {
    fn default() -> Self {
        let (state, _) = watch::channel(false);
        Self { state }
    }
}

impl ChildLockControl {
    pub fn is_on(&self) -> bool {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    pub fn set_child_lock(&self, on: bool) {
        self.state.send_if_modified(|s| {
            let changed = *s != on;
            *s = on;
            changed
        });
    }
}
