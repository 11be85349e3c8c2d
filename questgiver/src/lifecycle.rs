//! Game lifecycle hooks.
//!
//! Hosts forward their save/load events to [`Questgiver`](crate::Questgiver), which
//! broadcasts them to every registered listener. All hooks default to doing nothing.

pub trait LifecycleListener {
    fn on_game_load(&self, _is_new_game: bool) {}
    fn before_game_save(&self) {}
    fn after_game_save(&self) {}
    fn on_game_save_failed(&self) {}
    fn on_new_game_after_proc_gen(&self) {}
    fn on_new_game_after_economy_load(&self) {}
    fn on_new_game_after_time_pass(&self) {}
}

/// Which hook to broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    GameLoad { is_new_game: bool },
    BeforeGameSave,
    AfterGameSave,
    GameSaveFailed,
    NewGameAfterProcGen,
    NewGameAfterEconomyLoad,
    NewGameAfterTimePass,
}

impl LifecycleEvent {
    pub(crate) fn dispatch(self, listener: &dyn LifecycleListener) {
        match self {
            LifecycleEvent::GameLoad { is_new_game } => listener.on_game_load(is_new_game),
            LifecycleEvent::BeforeGameSave => listener.before_game_save(),
            LifecycleEvent::AfterGameSave => listener.after_game_save(),
            LifecycleEvent::GameSaveFailed => listener.on_game_save_failed(),
            LifecycleEvent::NewGameAfterProcGen => listener.on_new_game_after_proc_gen(),
            LifecycleEvent::NewGameAfterEconomyLoad => listener.on_new_game_after_economy_load(),
            LifecycleEvent::NewGameAfterTimePass => listener.on_new_game_after_time_pass(),
        }
    }
}
