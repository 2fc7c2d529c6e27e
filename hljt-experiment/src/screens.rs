use crate::config::TaskConfig;

/// Message screens shown between trial runs. The sequencer owns which
/// screen is up and when its confirmation key arms; the renderer only
/// draws the content described here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    InstructionsIntro,
    InstructionsKeys,
    PracticeIntro,
    PracticeComplete,
    Break,
    ThanksDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKey {
    Any,
    Space,
}

impl Screen {
    pub fn confirm_key(&self) -> ConfirmKey {
        match self {
            Screen::InstructionsIntro | Screen::InstructionsKeys | Screen::Break => {
                ConfirmKey::Space
            }
            Screen::PracticeIntro | Screen::PracticeComplete | Screen::ThanksDone => {
                ConfirmKey::Any
            }
        }
    }

    /// Whether `key` confirms this screen. `None` stands for a pressed key
    /// with no character value, which still counts for any-key screens.
    pub fn accepts(&self, key: Option<char>) -> bool {
        match self.confirm_key() {
            ConfirmKey::Any => true,
            ConfirmKey::Space => key == Some(' '),
        }
    }

    /// Headline drawn above the body, where the screen has one.
    pub fn title(&self) -> Option<&'static str> {
        match self {
            Screen::InstructionsIntro => Some("Welcome to the Hand Laterality Judgement Task!"),
            _ => None,
        }
    }

    /// Main message body. Shown immediately; the prompt line below is held
    /// back until the screen arms.
    pub fn body(&self, config: &TaskConfig) -> String {
        match self {
            Screen::InstructionsIntro => String::from(
                "In this task you will see pictures of hands,\n\
                 rotated by varying amounts.\n\
                 Decide as quickly and as accurately as you can\n\
                 whether each one is a LEFT or a RIGHT hand.",
            ),
            Screen::InstructionsKeys => format!(
                "Press '{}' when the hand is a LEFT hand.\n\
                 Press '{}' when the hand is a RIGHT hand.\n\
                 Respond only once the hand has appeared.",
                config.keymap.left, config.keymap.right
            ),
            Screen::PracticeIntro => {
                String::from("We will begin with a short practice round.")
            }
            Screen::PracticeComplete => {
                String::from("Practice complete!\nThe real task begins now.")
            }
            Screen::Break => String::from("Take a break!"),
            Screen::ThanksDone => {
                String::from("You're all done.\nThank you for participating!")
            }
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self.confirm_key() {
            ConfirmKey::Space => "Press space to continue",
            ConfirmKey::Any => match self {
                Screen::ThanksDone => "Press any key to exit",
                _ => "Press any key to continue",
            },
        }
    }
}

/// The active screen plus when it went up, for arming the prompt.
#[derive(Debug, Clone, Copy)]
pub struct ScreenState<Ts> {
    pub screen: Screen,
    pub shown_at: Ts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_screens_reject_other_keys() {
        assert!(Screen::Break.accepts(Some(' ')));
        assert!(!Screen::Break.accepts(Some('q')));
        assert!(!Screen::Break.accepts(None));
        assert!(!Screen::InstructionsIntro.accepts(Some('p')));
    }

    #[test]
    fn any_key_screens_accept_everything() {
        assert!(Screen::PracticeIntro.accepts(Some('z')));
        assert!(Screen::PracticeIntro.accepts(None));
        assert!(Screen::ThanksDone.accepts(Some(' ')));
    }

    #[test]
    fn key_screen_text_reflects_the_keymap() {
        let config = TaskConfig::default();
        let body = Screen::InstructionsKeys.body(&config);
        assert!(body.contains("'q'"));
        assert!(body.contains("'p'"));
    }
}
