use crate::domain::asset::{Asset, Direction, Language};
use crate::domain::order::UserId;
use crate::domain::quote::{Amount, Quote};

/// Points at which the intake dialogue waits for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    SelectLanguage,
    ChooseDirection,
    PickAsset,
    EnterAmount,
    EnterWallet,
    AwaitingReceipt,
}

/// Per-user dialogue state.
///
/// Request fields are filled in as the user advances and cleared again once
/// the request has been handed to the reviewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: UserId,
    pub username: Option<String>,
    pub state: SessionState,
    pub language: Language,
    pub direction: Option<Direction>,
    pub asset: Option<Asset>,
    pub amount: Option<Amount>,
    pub quote: Option<Quote>,
    pub payout_wallet: Option<String>,
    pub retry_count: u32,
}

impl Session {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            username: None,
            state: SessionState::SelectLanguage,
            language: Language::default(),
            direction: None,
            asset: None,
            amount: None,
            quote: None,
            payout_wallet: None,
            retry_count: 0,
        }
    }

    /// Back to language selection with nothing remembered but the user.
    pub fn reset(&mut self) {
        let username = self.username.take();
        *self = Session::new(self.user);
        self.username = username;
    }

    pub fn select_language(&mut self, language: Language) {
        self.language = language;
        self.retry_count = 0;
        self.clear_request();
        self.state = SessionState::ChooseDirection;
    }

    /// Drops the in-flight request but keeps language and retry count.
    pub fn clear_request(&mut self) {
        self.direction = None;
        self.asset = None;
        self.amount = None;
        self.quote = None;
        self.payout_wallet = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_session_starts_at_language() {
        let session = Session::new(1);
        assert_eq!(session.state, SessionState::SelectLanguage);
        assert_eq!(session.retry_count, 0);
        assert!(session.direction.is_none());
    }

    #[test]
    fn test_reset_keeps_identity_only() {
        let mut session = Session::new(9);
        session.username = Some("bob".to_string());
        session.select_language(Language::English);
        session.direction = Some(Direction::Buy);
        session.amount = Some(Amount::new(dec!(1)).unwrap());
        session.retry_count = 3;

        session.reset();
        assert_eq!(session.user, 9);
        assert_eq!(session.username.as_deref(), Some("bob"));
        assert_eq!(session.state, SessionState::SelectLanguage);
        assert_eq!(session.retry_count, 0);
        assert!(session.amount.is_none());
    }

    #[test]
    fn test_language_selection_resets_retries() {
        let mut session = Session::new(1);
        session.retry_count = 2;
        session.select_language(Language::Armenian);
        assert_eq!(session.retry_count, 0);
        assert_eq!(session.language, Language::Armenian);
        assert_eq!(session.state, SessionState::ChooseDirection);
    }
}
