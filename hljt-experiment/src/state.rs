use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;

use hljt_core::{Hand, Phase, Response, TrialDescriptor, TrialResult, TrialState};
use hljt_timing::Timer;

use crate::config::TaskConfig;
use crate::deck::shuffled_choices;
use crate::factory::{stimulus_keys, TrialFactory};
use crate::screens::{Screen, ScreenState};
use crate::trial::ActiveTrial;

pub const DEMO_HAND_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    ScreenAdvanced,
    TrialCompleted(TrialResult),
    BlockComplete,
    PhaseComplete,
    SessionComplete,
}

/// Session-wide counters, gathered in one place instead of loose globals.
#[derive(Debug, Clone, Copy)]
pub struct SessionState {
    /// 1-based block counter; the practice block counts.
    pub block_number: usize,
    /// 1-based trial counter within the current block.
    pub trial_number: usize,
    pub trials_completed: usize,
    pub trials_since_break: usize,
    /// True until the first task block starts.
    pub first_block: bool,
}

/// Drives one session: instruction screens, the optional practice block,
/// the task blocks with breaks, and the completion screen.
///
/// Time-driven transitions happen in [`update`](Self::update), key input
/// goes through [`handle_key`](Self::handle_key), and the shell reports
/// the presented stimulus frame via
/// [`mark_stimulus_onset`](Self::mark_stimulus_onset). Everything the
/// renderer needs is pulled through accessors, so the machine itself never
/// touches a display.
pub struct TaskStateMachine<P, T, R>
where
    P: Phase,
    T: Timer,
    R: Rng,
{
    pub phase: P,
    pub timer: T,
    pub rng: R,
    pub config: TaskConfig,
    pub session: SessionState,
    pub current: Option<ActiveTrial<T::Timestamp>>,
    pub screen: Option<ScreenState<T::Timestamp>>,
    pub results: Vec<TrialResult>,

    demo_hands: Vec<TrialDescriptor>,
    schedule: VecDeque<Vec<TrialDescriptor>>,
    block_trials: Vec<TrialDescriptor>,
    cursor: usize,
    phase_blocks_done: usize,
    finished: bool,
}

impl<P, T, R> TaskStateMachine<P, T, R>
where
    P: Phase,
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(config: TaskConfig, timer: T, mut rng: R) -> Self {
        // the whole session schedule is dealt up front
        let mut factory = TrialFactory::new(&config);
        let mut schedule = VecDeque::new();
        if config.practice_enabled() {
            schedule.push_back(factory.block_trials(&mut rng, config.practice_trials));
        }
        for _ in 0..config.blocks {
            schedule.push_back(factory.block_trials(&mut rng, config.trials_per_block));
        }

        let demo_keys = shuffled_choices(&mut rng, &stimulus_keys(&config), DEMO_HAND_COUNT);
        let demo_rotations = shuffled_choices(&mut rng, &config.rotations, DEMO_HAND_COUNT);
        let demo_hands = demo_keys
            .into_iter()
            .zip(demo_rotations)
            .map(|(key, rotation)| TrialDescriptor { key, rotation })
            .collect();

        let now = timer.now();
        Self {
            phase: P::default(),
            timer,
            rng,
            config,
            session: SessionState {
                block_number: 0,
                trial_number: 0,
                trials_completed: 0,
                trials_since_break: 0,
                first_block: true,
            },
            current: None,
            screen: Some(ScreenState {
                screen: Screen::InstructionsIntro,
                shown_at: now,
            }),
            results: Vec::new(),
            demo_hands,
            schedule,
            block_trials: Vec::new(),
            cursor: 0,
            phase_blocks_done: 0,
            finished: false,
        }
    }

    /// Time-driven transitions; call once per event-loop tick.
    pub fn update(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        if self.finished || self.screen.is_some() {
            return events;
        }

        if self.current.is_none() {
            // normally unreachable, but an empty block resolves here
            if (self.phase.is_practice() || self.phase.is_task())
                && self.cursor >= self.block_trials.len()
            {
                events.extend(self.finish_block());
            }
            return events;
        }

        if let Some(trial) = &mut self.current {
            if trial.state == TrialState::Fixation
                && self.timer.elapsed(trial.fixation_start)
                    >= Duration::from_millis(self.config.fixation_ms)
            {
                trial.state = TrialState::Stimulus;
                tracing::debug!("fixation over, stimulus up");
            }
        }

        let timed_out = match (&self.current, self.config.response_timeout_ms) {
            (Some(trial), Some(timeout_ms)) if trial.state == TrialState::Response => {
                let onset = trial.stimulus_start.unwrap_or(trial.fixation_start);
                self.timer.elapsed(onset) >= Duration::from_millis(timeout_ms)
            }
            _ => false,
        };
        if timed_out {
            tracing::info!("response window elapsed without a judgement");
            events.extend(self.complete_current_trial());
        }

        events
    }

    /// Key input from the shell. `key` carries the character for the pressed
    /// key, or `None` for keys without one (those still confirm any-key
    /// screens). Returns the events the press caused.
    pub fn handle_key(&mut self, key: Option<char>) -> Vec<TaskEvent> {
        if self.finished {
            return Vec::new();
        }

        if let Some(state) = self.screen {
            if self.screen_armed() && state.screen.accepts(key) {
                return self.confirm_screen(state.screen);
            }
            return Vec::new();
        }

        let judgement = match (&self.current, key) {
            (Some(trial), Some(ch)) if trial.state == TrialState::Response => {
                self.config.keymap.judge(ch)
            }
            _ => None,
        };

        match judgement {
            Some(hand) => self.record_response(hand),
            None => Vec::new(),
        }
    }

    /// Called by the shell after the first frame showing the stimulus has
    /// been presented; opens the response window and anchors rt.
    pub fn mark_stimulus_onset(&mut self) {
        let now = self.timer.now();
        if let Some(trial) = self.current.as_mut() {
            if trial.state == TrialState::Stimulus {
                trial.stimulus_start = Some(now);
                trial.state = TrialState::Response;
                tracing::debug!(at_ns = now, "stimulus onset marked");
            }
        }
    }

    pub fn advance_phase(&mut self) -> bool {
        if let Some(next) = self.phase.next() {
            tracing::info!(from = ?self.phase, to = ?next, "phase advanced");
            self.phase = next;
            self.phase_blocks_done = 0;
            true
        } else {
            false
        }
    }

    fn record_response(&mut self, hand: Hand) -> Vec<TaskEvent> {
        let now = self.timer.now();
        let Some(trial) = self.current.as_mut() else {
            return Vec::new();
        };
        if trial.state != TrialState::Response {
            return Vec::new();
        }

        let rt = trial
            .stimulus_start
            .map(|onset| now.saturating_sub(onset) as f64 / 1_000_000.0);
        trial.response = Response {
            judgement: Some(hand),
            rt,
        };
        trial.state = TrialState::Complete;
        tracing::debug!(judgement = %hand, rt = ?rt, "response recorded");

        self.complete_current_trial()
    }

    fn complete_current_trial(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        let Some(mut trial) = self.current.take() else {
            return events;
        };
        trial.state = TrialState::Complete;

        let d = trial.descriptor;
        let result = TrialResult {
            block_num: self.session.block_number,
            trial_num: self.session.trial_number,
            hand: d.key.hand,
            sex: d.key.sex,
            angle: d.key.angle,
            rotation: d.rotation,
            judgement: trial.response.judgement,
            rt: trial.response.rt,
            accuracy: trial.response.judgement == Some(d.key.hand),
        };
        tracing::info!(
            block = result.block_num,
            trial = result.trial_num,
            accuracy = result.accuracy,
            rt = ?result.rt,
            "trial complete"
        );
        self.results.push(result.clone());
        events.push(TaskEvent::TrialCompleted(result));

        self.session.trials_completed += 1;
        self.session.trials_since_break += 1;

        self.timer
            .sleep(Duration::from_millis(self.config.inter_trial_ms));

        if self.cursor < self.block_trials.len() {
            // break check happens before the next stimulus is prepared
            if self.session.trials_since_break >= self.config.break_interval {
                self.show_screen(Screen::Break);
            } else {
                self.start_trial();
            }
        } else {
            events.extend(self.finish_block());
        }

        events
    }

    fn finish_block(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        self.phase_blocks_done += 1;
        if self.phase_blocks_done < self.blocks_in_phase() {
            tracing::info!(block = self.session.block_number, "block complete");
            events.push(TaskEvent::BlockComplete);
            self.show_screen(Screen::Break);
        } else {
            events.push(TaskEvent::PhaseComplete);
            events.extend(self.enter_next_phase());
        }
        events
    }

    fn enter_next_phase(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        loop {
            let ran_practice = self.phase.is_practice() && self.config.practice_enabled();
            if !self.advance_phase() {
                self.finished = true;
                events.push(TaskEvent::SessionComplete);
                return events;
            }

            if self.phase.is_practice() {
                if !self.config.practice_enabled() {
                    continue;
                }
                self.show_screen(Screen::PracticeIntro);
                return events;
            }

            if self.phase.is_task() {
                if ran_practice {
                    self.show_screen(Screen::PracticeComplete);
                } else {
                    self.start_block();
                }
                return events;
            }

            if self.phase.is_done() {
                self.show_screen(Screen::ThanksDone);
                return events;
            }
        }
    }

    fn confirm_screen(&mut self, screen: Screen) -> Vec<TaskEvent> {
        let mut events = vec![TaskEvent::ScreenAdvanced];
        self.screen = None;
        tracing::debug!(?screen, "screen confirmed");

        match screen {
            Screen::InstructionsIntro => self.show_screen(Screen::InstructionsKeys),
            Screen::InstructionsKeys => {
                events.push(TaskEvent::PhaseComplete);
                events.extend(self.enter_next_phase());
            }
            Screen::PracticeIntro | Screen::PracticeComplete => self.start_block(),
            Screen::Break => {
                self.session.trials_since_break = 0;
                if self.cursor < self.block_trials.len() {
                    self.start_trial();
                } else {
                    self.start_block();
                }
            }
            Screen::ThanksDone => {
                self.finished = true;
                events.push(TaskEvent::SessionComplete);
            }
        }

        events
    }

    fn start_block(&mut self) {
        self.session.block_number += 1;
        self.session.trial_number = 0;
        self.session.trials_since_break = 0;
        if self.phase.is_task() {
            self.session.first_block = false;
        }
        self.block_trials = self.schedule.pop_front().unwrap_or_default();
        self.cursor = 0;
        tracing::info!(
            block = self.session.block_number,
            trials = self.block_trials.len(),
            practice = self.phase.is_practice(),
            "block started"
        );
        self.start_trial();
    }

    fn start_trial(&mut self) {
        let Some(&descriptor) = self.block_trials.get(self.cursor) else {
            return;
        };
        self.cursor += 1;
        self.session.trial_number = self.cursor;
        let now = self.timer.now();
        tracing::debug!(
            block = self.session.block_number,
            trial = self.session.trial_number,
            stimulus = %descriptor.key,
            rotation = descriptor.rotation,
            "trial started"
        );
        self.current = Some(ActiveTrial::new(descriptor, now));
    }

    fn show_screen(&mut self, screen: Screen) {
        let now = self.timer.now();
        tracing::debug!(?screen, "screen shown");
        self.screen = Some(ScreenState {
            screen,
            shown_at: now,
        });
    }

    fn blocks_in_phase(&self) -> usize {
        if self.phase.is_practice() {
            1
        } else if self.phase.is_task() {
            self.config.blocks
        } else {
            0
        }
    }

    pub fn current_screen(&self) -> Option<Screen> {
        self.screen.as_ref().map(|s| s.screen)
    }

    /// Whether the active screen accepts its confirmation key yet.
    pub fn screen_armed(&self) -> bool {
        self.screen.as_ref().map_or(false, |s| {
            self.timer.elapsed(s.shown_at) >= Duration::from_millis(self.config.prompt_delay_ms)
        })
    }

    pub fn should_show_fixation(&self) -> bool {
        self.current
            .as_ref()
            .map_or(false, |t| t.state == TrialState::Fixation)
    }

    /// Stimulus to draw this frame, once the trial is at or past onset.
    pub fn current_stimulus(&self) -> Option<TrialDescriptor> {
        self.current.as_ref().and_then(|t| {
            matches!(t.state, TrialState::Stimulus | TrialState::Response).then_some(t.descriptor)
        })
    }

    /// True between the stimulus going up and the shell confirming the
    /// presented frame.
    pub fn stimulus_onset_pending(&self) -> bool {
        self.current
            .as_ref()
            .map_or(false, |t| t.state == TrialState::Stimulus)
    }

    /// Hands composited onto the instruction screens.
    pub fn demo_hands(&self) -> &[TrialDescriptor] {
        &self.demo_hands
    }

    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    pub fn current_phase(&self) -> &P {
        &self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
