/// Defines session phases and their ordering
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn next(&self) -> Option<Self>;

    fn is_instructions(&self) -> bool {
        false
    }
    fn is_practice(&self) -> bool {
        false
    }
    fn is_task(&self) -> bool {
        false
    }
    fn is_done(&self) -> bool {
        false
    }
}

#[derive(Copy, Debug, Clone, PartialEq)]
pub enum TaskPhase {
    Instructions,
    Practice,
    Task,
    Done,
}

impl Default for TaskPhase {
    fn default() -> Self {
        TaskPhase::Instructions
    }
}

impl Phase for TaskPhase {
    fn next(&self) -> Option<Self> {
        use TaskPhase::*;
        Some(match self {
            Instructions => Practice,
            Practice => Task,
            Task => Done,
            Done => return None,
        })
    }

    fn is_instructions(&self) -> bool {
        matches!(self, TaskPhase::Instructions)
    }

    fn is_practice(&self) -> bool {
        matches!(self, TaskPhase::Practice)
    }

    fn is_task(&self) -> bool {
        matches!(self, TaskPhase::Task)
    }

    fn is_done(&self) -> bool {
        matches!(self, TaskPhase::Done)
    }
}
