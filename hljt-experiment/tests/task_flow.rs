use hljt_core::{Hand, Phase, Sex, TaskPhase};
use hljt_experiment::{Screen, TaskConfig, TaskEvent, TaskStateMachine};
use hljt_timing::ManualTimer;
use rand::rngs::StdRng;
use rand::SeedableRng;

type Machine = TaskStateMachine<TaskPhase, ManualTimer, StdRng>;

fn single_angle_config() -> TaskConfig {
    TaskConfig {
        run_practice: false,
        blocks: 1,
        trials_per_block: 4,
        break_interval: 24,
        fixation_ms: 1000,
        prompt_delay_ms: 1500,
        inter_trial_ms: 500,
        angles: vec![90],
        rotations: vec![0],
        ..TaskConfig::default()
    }
}

fn confirm(m: &mut Machine) -> Vec<TaskEvent> {
    m.timer.advance_ms(m.config.prompt_delay_ms);
    m.handle_key(Some(' '))
}

fn answer_current_trial(m: &mut Machine, key: char, rt_ms: u64) -> Vec<TaskEvent> {
    assert!(m.should_show_fixation());
    m.timer.advance_ms(m.config.fixation_ms);
    m.update();
    assert!(m.stimulus_onset_pending());
    m.mark_stimulus_onset();
    m.timer.advance_ms(rt_ms);
    m.handle_key(Some(key))
}

/// Runs a whole four-trial session, answering with the ground-truth key,
/// and checks the recorded rows field by field.
#[test]
fn full_session_records_one_accurate_row_per_trial() {
    let config = single_angle_config();
    let mut m = Machine::new(config, ManualTimer::new(), StdRng::seed_from_u64(1));

    assert_eq!(m.current_screen(), Some(Screen::InstructionsIntro));
    confirm(&mut m);
    assert_eq!(m.current_screen(), Some(Screen::InstructionsKeys));
    confirm(&mut m);
    assert!(m.current_phase().is_task());

    for expected_trial in 1..=4 {
        let d = {
            assert!(m.should_show_fixation());
            m.timer.advance_ms(1000);
            m.update();
            m.mark_stimulus_onset();
            m.current_stimulus().unwrap()
        };
        let key = match d.key.hand {
            Hand::Left => 'q',
            Hand::Right => 'p',
        };
        m.timer.advance_ms(450);
        let events = m.handle_key(Some(key));
        let row = match &events[0] {
            TaskEvent::TrialCompleted(row) => row.clone(),
            other => panic!("expected a completed trial, got {other:?}"),
        };

        assert_eq!(row.block_num, 1);
        assert_eq!(row.trial_num, expected_trial);
        assert_eq!(row.hand, d.key.hand);
        assert_eq!(row.sex, d.key.sex);
        assert_eq!(row.angle, 90);
        assert_eq!(row.rotation, 0);
        assert_eq!(row.judgement, Some(d.key.hand));
        assert_eq!(row.rt, Some(450.0));
        assert!(row.accuracy);

        if expected_trial == 4 {
            assert_eq!(m.current_screen(), Some(Screen::ThanksDone));
        }
    }

    let events = confirm(&mut m);
    assert!(events.contains(&TaskEvent::SessionComplete));
    assert!(m.is_finished());
    assert_eq!(m.results().len(), 4);
    assert_eq!(m.session.trials_completed, 4);
}

/// The canonical scenario: a female left hand at the 90 degree view,
/// unrotated, answered with the left-hand key.
#[test]
fn left_hand_answered_with_the_left_key_scores_accurate() {
    let config = single_angle_config();
    let mut m = Machine::new(config, ManualTimer::new(), StdRng::seed_from_u64(7));
    confirm(&mut m);
    confirm(&mut m);

    // the first four trials cross sex and hand exactly once each, so the
    // F/L/90 stimulus is guaranteed to come up
    let mut seen = false;
    for _ in 0..4 {
        let d = {
            m.timer.advance_ms(1000);
            m.update();
            m.mark_stimulus_onset();
            m.current_stimulus().unwrap()
        };
        m.timer.advance_ms(380);
        m.handle_key(Some('q'));

        if d.key.hand == Hand::Left && d.key.sex == Sex::Female {
            seen = true;
            let row = m.results().last().unwrap();
            assert_eq!(row.hand, Hand::Left);
            assert_eq!(row.sex, Sex::Female);
            assert_eq!(row.angle, 90);
            assert_eq!(row.rotation, 0);
            assert_eq!(row.judgement, Some(Hand::Left));
            assert!(row.accuracy);
            assert_eq!(row.rt, Some(380.0));
        }
    }
    assert!(seen, "F/L/90 never came up in a full crossing");
}

/// Pressing 'q' on right hands must never score as accurate.
#[test]
fn judgement_must_match_ground_truth_for_accuracy() {
    let config = single_angle_config();
    let mut m = Machine::new(config, ManualTimer::new(), StdRng::seed_from_u64(3));
    confirm(&mut m);
    confirm(&mut m);

    for _ in 0..4 {
        answer_current_trial(&mut m, 'q', 300);
    }

    for row in m.results() {
        assert_eq!(row.judgement, Some(Hand::Left));
        assert_eq!(row.accuracy, row.hand == Hand::Left);
    }
    let accurate = m.results().iter().filter(|r| r.accuracy).count();
    assert_eq!(accurate, 2, "exactly the two left-hand trials match");
}

/// Quitting mid-session leaves the rows gathered so far intact.
#[test]
fn partial_results_survive_an_early_stop() {
    let config = single_angle_config();
    let mut m = Machine::new(config, ManualTimer::new(), StdRng::seed_from_u64(5));
    confirm(&mut m);
    confirm(&mut m);

    answer_current_trial(&mut m, 'q', 300);
    answer_current_trial(&mut m, 'p', 300);

    // the shell would export these on escape; nothing resets them
    assert_eq!(m.results().len(), 2);
    assert_eq!(m.session.trials_completed, 2);
    assert!(!m.is_finished());
}
