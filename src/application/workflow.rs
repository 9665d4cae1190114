use crate::application::pricing::PriceAggregator;
use crate::application::registry::{ApprovalRegistry, Resolution};
use crate::domain::asset::{Asset, AssetCatalog, Direction, Language, MenuChoice};
use crate::domain::event::{Event, UserInput};
use crate::domain::order::{
    Decision, OrderRecord, OrderStatus, PendingApproval, RequestId, ReviewRequest, UserId,
};
use crate::domain::ports::{OrderSinkBox, TransportBox};
use crate::domain::quote::{Amount, FeeCalculator};
use crate::domain::receipt::ReceiptInspector;
use crate::domain::reply::Reply;
use crate::domain::session::{Session, SessionState};
use crate::domain::wallet::WalletValidator;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// The slice of configuration the dialogue needs.
#[derive(Debug, Clone)]
pub struct DeskSettings {
    pub catalog: AssetCatalog,
    pub fee_rate: Decimal,
    pub quote_currency: String,
    /// Where users pay the quote currency on Buy.
    pub payment_address: String,
    /// Where users send the asset on Sell.
    pub deposit_addresses: HashMap<Asset, String>,
}

/// Drives every user's intake dialogue and arbitrates reviewer decisions.
///
/// Sessions are independent of each other; each one is behind its own lock so
/// a user's steps run one at a time while different users proceed in parallel.
pub struct Workflow {
    settings: DeskSettings,
    calculator: FeeCalculator,
    prices: Arc<PriceAggregator>,
    validator: WalletValidator,
    inspector: ReceiptInspector,
    registry: Arc<ApprovalRegistry>,
    transport: TransportBox,
    sink: OrderSinkBox,
    sessions: RwLock<HashMap<UserId, Arc<Mutex<Session>>>>,
}

impl Workflow {
    /// Creates a workflow with the default wallet validator, a receipt
    /// inspector on the local calendar, and a fresh approval registry.
    pub fn new(
        settings: DeskSettings,
        prices: Arc<PriceAggregator>,
        transport: TransportBox,
        sink: OrderSinkBox,
    ) -> Self {
        Self {
            calculator: FeeCalculator::new(settings.fee_rate),
            settings,
            prices,
            validator: WalletValidator::default(),
            inspector: ReceiptInspector::default(),
            registry: Arc::new(ApprovalRegistry::new()),
            transport,
            sink,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_validator(mut self, validator: WalletValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_inspector(mut self, inspector: ReceiptInspector) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_registry(mut self, registry: Arc<ApprovalRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<ApprovalRegistry> {
        &self.registry
    }

    /// A copy of the user's session, if the user has written before.
    pub async fn session(&self, user: UserId) -> Option<Session> {
        let handle = self.sessions.read().await.get(&user).cloned()?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    pub async fn dispatch(&self, event: Event) {
        match event {
            Event::Message {
                user,
                username,
                input,
            } => {
                self.handle_message(user, username, input).await;
            }
            Event::Decision {
                request_id,
                decision,
            } => {
                self.handle_decision(request_id, decision).await;
            }
        }
    }

    /// Advances the user's session by one input and returns the state it
    /// ends up waiting in.
    pub async fn handle_message(
        &self,
        user: UserId,
        username: Option<String>,
        input: UserInput,
    ) -> SessionState {
        let handle = self.session_handle(user).await;
        let mut session = handle.lock().await;
        if username.is_some() {
            session.username = username;
        }

        if input.is_restart() {
            debug!(user, "Restart requested");
            session.reset();
            self.reply(&session, Reply::ChooseLanguage).await;
            return session.state;
        }

        match session.state {
            SessionState::SelectLanguage => self.on_select_language(&mut session, &input).await,
            SessionState::ChooseDirection => self.on_choose_direction(&mut session, &input).await,
            SessionState::PickAsset => self.on_pick_asset(&mut session, &input).await,
            SessionState::EnterAmount => self.on_enter_amount(&mut session, &input).await,
            SessionState::EnterWallet => self.on_enter_wallet(&mut session, &input).await,
            SessionState::AwaitingReceipt => self.on_receipt(&mut session, input).await,
        }
        session.state
    }

    /// Applies a reviewer decision. Only the first decision for a request has
    /// any effect; later ones come back as `NotFound`.
    pub async fn handle_decision(&self, request_id: RequestId, decision: Decision) -> Resolution {
        let approval = match self.registry.resolve(request_id, decision).await {
            Resolution::Resolved(approval) => approval,
            Resolution::NotFound => return Resolution::NotFound,
        };

        info!(
            request_id,
            user = approval.user,
            ?decision,
            "Request resolved by reviewer"
        );
        match decision {
            Decision::Approve => {
                let reply = Reply::Approved {
                    asset: approval.asset.clone(),
                    amount: approval.amount,
                    total: approval.quote.total,
                };
                self.send(approval.user, approval.language, reply).await;
            }
            Decision::Reject => {
                self.send(approval.user, approval.language, Reply::Rejected)
                    .await;
                self.send(approval.user, approval.language, Reply::Menu)
                    .await;
            }
        }
        self.record(OrderRecord::from_approval(&approval, decision.into()))
            .await;
        if let Err(e) = self.transport.close_review(request_id, decision).await {
            warn!(request_id, error = %e, "Failed to close review message");
        }
        Resolution::Resolved(approval)
    }

    async fn on_select_language(&self, session: &mut Session, input: &UserInput) {
        let Some(language) = text_of(input).and_then(Language::from_token) else {
            self.reply(session, Reply::ChooseLanguage).await;
            return;
        };

        session.select_language(language);
        debug!(user = session.user, ?language, "Language selected");
        self.prices.refresh_if_stale().await;
        let snapshot = self.prices.snapshot().await;
        let prices = self
            .settings
            .catalog
            .assets()
            .iter()
            .filter_map(|a| snapshot.price(a).map(|p| (a.clone(), p)))
            .collect();
        self.reply(
            session,
            Reply::Rates {
                prices,
                fee_rate: self.settings.fee_rate,
            },
        )
        .await;
        self.reply(session, Reply::Menu).await;
    }

    async fn on_choose_direction(&self, session: &mut Session, input: &UserInput) {
        match text_of(input).and_then(MenuChoice::from_token) {
            Some(MenuChoice::Trade(direction)) => {
                session.clear_request();
                session.direction = Some(direction);
                session.state = SessionState::PickAsset;
                self.prompt_asset(session).await;
            }
            Some(MenuChoice::Back) => {
                session.reset();
                self.reply(session, Reply::ChooseLanguage).await;
            }
            None => self.reply(session, Reply::Menu).await,
        }
    }

    async fn on_pick_asset(&self, session: &mut Session, input: &UserInput) {
        let Some(asset) = text_of(input).and_then(|t| self.settings.catalog.parse(t)) else {
            self.prompt_asset(session).await;
            return;
        };
        session.asset = Some(asset);
        session.state = SessionState::EnterAmount;
        self.prompt_amount(session).await;
    }

    async fn on_enter_amount(&self, session: &mut Session, input: &UserInput) {
        let (Some(direction), Some(asset)) = (session.direction, session.asset.clone()) else {
            warn!(user = session.user, "Amount step reached without direction or asset");
            session.reset();
            self.reply(session, Reply::ChooseLanguage).await;
            return;
        };
        let Some(amount) = text_of(input).and_then(|t| Amount::parse(t).ok()) else {
            self.prompt_amount(session).await;
            return;
        };

        // Always priced from the snapshot current at this moment.
        let Some(price) = self.prices.price(&asset).await else {
            warn!(user = session.user, %asset, "No price for asset, asking again");
            session.asset = None;
            session.state = SessionState::PickAsset;
            self.prompt_asset(session).await;
            return;
        };
        let Some(quote) = self.calculator.quote(direction, amount, price) else {
            debug!(user = session.user, %asset, amount = %amount.value(), "Amount out of range");
            self.prompt_amount(session).await;
            return;
        };
        session.amount = Some(amount);
        session.quote = Some(quote);
        session.state = SessionState::EnterWallet;
        debug!(user = session.user, %asset, %price, total = %quote.total, "Quote computed");

        self.reply(
            session,
            Reply::QuoteSummary {
                direction,
                asset: asset.clone(),
                amount,
                quote,
                fee_rate: self.calculator.fee_rate(),
            },
        )
        .await;
        let pay_to = match direction {
            Direction::Buy => Some((
                self.settings.quote_currency.clone(),
                self.settings.payment_address.clone(),
            )),
            Direction::Sell => self
                .settings
                .deposit_addresses
                .get(&asset)
                .map(|address| (asset.to_string(), address.clone())),
        };
        match pay_to {
            Some((currency, address)) => {
                self.reply(session, Reply::PayTo { currency, address })
                    .await
            }
            None => warn!(%asset, "No deposit address configured"),
        }
        self.reply(session, Reply::EnterWallet).await;
    }

    async fn on_enter_wallet(&self, session: &mut Session, input: &UserInput) {
        let Some(address) = text_of(input).map(str::trim) else {
            self.reply(session, Reply::EnterWallet).await;
            return;
        };
        match self.validator.validate(address) {
            Ok(()) => {
                session.payout_wallet = Some(address.to_string());
                session.state = SessionState::AwaitingReceipt;
                self.reply(session, Reply::SendReceipt).await;
            }
            Err(reason) => {
                debug!(user = session.user, %reason, "Wallet rejected");
                self.reply(session, Reply::InvalidWallet(reason)).await;
            }
        }
    }

    async fn on_receipt(&self, session: &mut Session, input: UserInput) {
        let UserInput::Image(receipt) = input else {
            self.reply(session, Reply::PhotoOnly).await;
            return;
        };

        session.retry_count += 1;
        let check = self.inspector.inspect(&receipt);
        if check.auto_reject() {
            info!(user = session.user, "Receipt not dated today, rejected automatically");
            self.reply(session, Reply::AutoRejected).await;
            session.reset();
            self.reply(session, Reply::ChooseLanguage).await;
            return;
        }

        let (Some(direction), Some(asset), Some(amount), Some(quote), Some(wallet)) = (
            session.direction,
            session.asset.clone(),
            session.amount,
            session.quote,
            session.payout_wallet.clone(),
        ) else {
            warn!(user = session.user, "Receipt arrived for an incomplete request");
            session.reset();
            self.reply(session, Reply::ChooseLanguage).await;
            return;
        };

        let is_retry = session.retry_count > 1;
        let review = ReviewRequest {
            user: session.user,
            username: session.username.clone(),
            direction,
            asset: asset.clone(),
            amount,
            quote,
            payout_wallet: wallet.clone(),
            receipt,
            metadata_missing: check.metadata_missing,
            is_retry,
        };
        let request_id = match self.transport.submit_review(review).await {
            Ok(id) => id,
            Err(e) => {
                error!(user = session.user, error = %e, "Failed to forward receipt to reviewer");
                session.retry_count = session.retry_count.saturating_sub(1);
                self.reply(session, Reply::ReviewUnavailable).await;
                return;
            }
        };

        let approval = PendingApproval {
            request_id,
            user: session.user,
            username: session.username.clone(),
            language: session.language,
            direction,
            asset,
            amount,
            quote,
            payout_wallet: wallet,
        };
        let record = OrderRecord::from_approval(&approval, OrderStatus::Pending);
        if !self.registry.submit(approval).await {
            error!(request_id, user = session.user, "Review id already pending, request dropped");
            session.retry_count = session.retry_count.saturating_sub(1);
            self.reply(session, Reply::ReviewUnavailable).await;
            return;
        }
        info!(
            request_id,
            user = session.user,
            is_retry,
            metadata_missing = check.metadata_missing,
            "Receipt forwarded for review"
        );
        self.record(record).await;

        session.clear_request();
        session.state = SessionState::ChooseDirection;
        self.reply(session, Reply::AwaitingReview).await;
    }

    async fn prompt_asset(&self, session: &Session) {
        let assets = self.settings.catalog.assets().to_vec();
        self.reply(session, Reply::PickAsset { assets }).await;
    }

    async fn prompt_amount(&self, session: &Session) {
        if let (Some(direction), Some(asset)) = (session.direction, session.asset.clone()) {
            self.reply(session, Reply::EnterAmount { direction, asset })
                .await;
        }
    }

    async fn session_handle(&self, user: UserId) -> Arc<Mutex<Session>> {
        if let Some(handle) = self.sessions.read().await.get(&user) {
            return Arc::clone(handle);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(user)))),
        )
    }

    async fn reply(&self, session: &Session, reply: Reply) {
        self.send(session.user, session.language, reply).await;
    }

    async fn send(&self, user: UserId, language: Language, reply: Reply) {
        if let Err(e) = self.transport.send(user, language, reply).await {
            warn!(user, error = %e, "Failed to deliver message");
        }
    }

    async fn record(&self, order: OrderRecord) {
        let status = order.status;
        if let Err(e) = self.sink.record(order).await {
            warn!(?status, error = %e, "Failed to record order");
        }
    }
}

fn text_of(input: &UserInput) -> Option<&str> {
    match input {
        UserInput::Text(text) => Some(text.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::OrderSink;
    use crate::domain::quote::Quote;
    use crate::domain::wallet::PassThroughChecksum;
    use crate::error::{DeskError, Result};
    use async_trait::async_trait;
    use crate::infrastructure::in_memory::{InMemoryOrderSink, RecordingTransport};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::time::Duration;

    const WALLET: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn settings() -> DeskSettings {
        DeskSettings {
            catalog: AssetCatalog::new(vec![Asset::new("BTC"), Asset::new("ETH")]),
            fee_rate: dec!(0.03),
            quote_currency: "USDT".to_string(),
            payment_address: "0xPLATFORM".to_string(),
            deposit_addresses: HashMap::from([
                (Asset::new("BTC"), "bc1platform".to_string()),
                (Asset::new("ETH"), "0xETHPLATFORM".to_string()),
            ]),
        }
    }

    struct FailingSink;

    #[async_trait]
    impl OrderSink for FailingSink {
        async fn record(&self, _order: OrderRecord) -> Result<()> {
            Err(DeskError::SinkError("order log offline".to_string()))
        }
    }

    fn workflow() -> (Workflow, RecordingTransport, InMemoryOrderSink) {
        let sink = InMemoryOrderSink::new();
        let (workflow, transport) = workflow_with_sink(Box::new(sink.clone()));
        (workflow, transport, sink)
    }

    fn workflow_with_sink(sink: OrderSinkBox) -> (Workflow, RecordingTransport) {
        let prices = PriceAggregator::new(
            vec![],
            BTreeMap::from([
                (Asset::new("BTC"), dec!(60000)),
                (Asset::new("ETH"), dec!(3000)),
            ]),
            Duration::from_secs(1),
            Duration::from_secs(30),
        );
        let transport = RecordingTransport::new();
        let workflow = Workflow::new(
            settings(),
            Arc::new(prices),
            Box::new(transport.clone()),
            sink,
        )
        .with_validator(WalletValidator::new(Box::new(PassThroughChecksum)))
        .with_inspector(ReceiptInspector::fixed(
            NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
        ));
        (workflow, transport)
    }

    fn text(s: &str) -> UserInput {
        UserInput::Text(s.to_string())
    }

    async fn walk_to_receipt(workflow: &Workflow, user: UserId, direction: &str) {
        workflow.handle_message(user, None, text("English")).await;
        workflow.handle_message(user, None, text(direction)).await;
        workflow.handle_message(user, None, text("eth")).await;
        workflow.handle_message(user, None, text("2")).await;
        let state = workflow.handle_message(user, None, text(WALLET)).await;
        assert_eq!(state, SessionState::AwaitingReceipt);
    }

    #[tokio::test]
    async fn test_invalid_inputs_reprompt_in_place() {
        let (workflow, transport, _) = workflow();
        assert_eq!(
            workflow.handle_message(1, None, text("Klingon")).await,
            SessionState::SelectLanguage
        );
        workflow.handle_message(1, None, text("English")).await;
        assert_eq!(
            workflow.handle_message(1, None, text("maybe")).await,
            SessionState::ChooseDirection
        );
        workflow.handle_message(1, None, text("Buy")).await;
        assert_eq!(
            workflow.handle_message(1, None, text("DOGE")).await,
            SessionState::PickAsset
        );
        workflow.handle_message(1, None, text("BTC")).await;
        for bad in ["-1", "0", "lots"] {
            assert_eq!(
                workflow.handle_message(1, None, text(bad)).await,
                SessionState::EnterAmount
            );
        }
        assert_eq!(
            workflow.handle_message(1, None, UserInput::Other).await,
            SessionState::EnterAmount
        );
        workflow.handle_message(1, None, text("0,01")).await;
        assert_eq!(
            workflow.handle_message(1, None, text("0x123")).await,
            SessionState::EnterWallet
        );

        let replies = transport.replies_for(1).await;
        assert!(replies.contains(&Reply::InvalidWallet(
            crate::domain::wallet::WalletError::WrongLength
        )));
    }

    #[tokio::test]
    async fn test_oversized_amount_reprompts() {
        let (workflow, transport, _) = workflow();
        workflow.handle_message(10, None, text("English")).await;
        workflow.handle_message(10, None, text("Buy")).await;
        workflow.handle_message(10, None, text("BTC")).await;
        assert_eq!(
            workflow
                .handle_message(10, None, text("79228162514264337593543950335"))
                .await,
            SessionState::EnterAmount
        );
        assert_eq!(
            transport.replies_for(10).await.last(),
            Some(&Reply::EnterAmount {
                direction: Direction::Buy,
                asset: Asset::new("BTC"),
            })
        );
        let session = workflow.session(10).await.unwrap();
        assert!(session.amount.is_none());
        assert!(session.quote.is_none());

        assert_eq!(
            workflow.handle_message(10, None, text("0.5")).await,
            SessionState::EnterWallet
        );
    }

    #[tokio::test]
    async fn test_sell_quote_and_deposit_address() {
        let (workflow, transport, _) = workflow();
        walk_to_receipt(&workflow, 2, "Sell").await;

        let replies = transport.replies_for(2).await;
        assert!(replies.contains(&Reply::PayTo {
            currency: "ETH".to_string(),
            address: "0xETHPLATFORM".to_string(),
        }));
        let quote = replies
            .iter()
            .find_map(|r| match r {
                Reply::QuoteSummary { quote, .. } => Some(*quote),
                _ => None,
            })
            .unwrap();
        assert_eq!(quote.base, dec!(6000));
        assert_eq!(quote.total, dec!(5820));
    }

    #[tokio::test]
    async fn test_non_image_receipt_reprompts() {
        let (workflow, transport, _) = workflow();
        walk_to_receipt(&workflow, 3, "Buy").await;
        assert_eq!(
            workflow.handle_message(3, None, text("here it is")).await,
            SessionState::AwaitingReceipt
        );
        assert_eq!(transport.replies_for(3).await.last(), Some(&Reply::PhotoOnly));
        assert!(transport.reviews().await.is_empty());
    }

    #[tokio::test]
    async fn test_retry_flag_on_second_submission() {
        let (workflow, transport, _) = workflow();
        walk_to_receipt(&workflow, 4, "Buy").await;
        workflow
            .handle_message(4, None, UserInput::Image(Vec::new()))
            .await;

        workflow.handle_message(4, None, text("Buy")).await;
        workflow.handle_message(4, None, text("ETH")).await;
        workflow.handle_message(4, None, text("1")).await;
        workflow.handle_message(4, None, text(WALLET)).await;
        workflow
            .handle_message(4, None, UserInput::Image(Vec::new()))
            .await;

        let reviews = transport.reviews().await;
        assert_eq!(reviews.len(), 2);
        assert!(!reviews[0].is_retry);
        assert!(reviews[1].is_retry);
        assert!(reviews[1].metadata_missing);
    }

    #[tokio::test]
    async fn test_restart_from_any_state() {
        let (workflow, _, _) = workflow();
        walk_to_receipt(&workflow, 5, "Buy").await;
        assert_eq!(
            workflow.handle_message(5, None, text("/start")).await,
            SessionState::SelectLanguage
        );
        let session = workflow.session(5).await.unwrap();
        assert!(session.asset.is_none());
        assert!(session.payout_wallet.is_none());
    }

    #[tokio::test]
    async fn test_back_returns_to_language() {
        let (workflow, transport, _) = workflow();
        workflow.handle_message(6, None, text("English")).await;
        assert_eq!(
            workflow.handle_message(6, None, text("⬅️ Back")).await,
            SessionState::SelectLanguage
        );
        assert_eq!(
            transport.replies_for(6).await.last(),
            Some(&Reply::ChooseLanguage)
        );
    }

    #[tokio::test]
    async fn test_review_failure_keeps_receipt_step() {
        let (workflow, transport, sink) = workflow();
        walk_to_receipt(&workflow, 8, "Buy").await;
        transport.fail_reviews(true);

        assert_eq!(
            workflow
                .handle_message(8, None, UserInput::Image(Vec::new()))
                .await,
            SessionState::AwaitingReceipt
        );
        assert_eq!(
            transport.replies_for(8).await.last(),
            Some(&Reply::ReviewUnavailable)
        );
        assert!(workflow.registry().is_empty().await);
        assert!(sink.records().await.is_empty());
        assert_eq!(workflow.session(8).await.unwrap().retry_count, 0);
    }

    #[tokio::test]
    async fn test_rejection_notifies_and_logs() {
        let (workflow, transport, sink) = workflow();
        walk_to_receipt(&workflow, 9, "Sell").await;
        workflow
            .handle_message(9, Some("carol".to_string()), UserInput::Image(Vec::new()))
            .await;

        let request_id = transport.reviews().await.len() as RequestId;
        let resolution = workflow.handle_decision(request_id, Decision::Reject).await;
        assert!(matches!(resolution, Resolution::Resolved(_)));

        let replies = transport.replies_for(9).await;
        assert!(replies.ends_with(&[Reply::Rejected, Reply::Menu]));
        let records = sink.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, OrderStatus::Rejected);
        assert_eq!(records[1].username.as_deref(), Some("carol"));
        assert_eq!(
            transport.closed().await,
            vec![(request_id, Decision::Reject)]
        );
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_block_review() {
        let (workflow, transport) = workflow_with_sink(Box::new(FailingSink));
        walk_to_receipt(&workflow, 11, "Buy").await;

        assert_eq!(
            workflow
                .handle_message(11, None, UserInput::Image(Vec::new()))
                .await,
            SessionState::ChooseDirection
        );
        assert_eq!(
            transport.replies_for(11).await.last(),
            Some(&Reply::AwaitingReview)
        );
        assert_eq!(workflow.registry().len().await, 1);

        let resolution = workflow.handle_decision(1, Decision::Approve).await;
        assert!(matches!(resolution, Resolution::Resolved(_)));
        assert!(matches!(
            transport.replies_for(11).await.last(),
            Some(Reply::Approved { .. })
        ));
        assert_eq!(transport.closed().await, vec![(1, Decision::Approve)]);
    }

    #[tokio::test]
    async fn test_duplicate_review_id_is_not_confirmed() {
        let (workflow, transport, sink) = workflow();
        let stale = PendingApproval {
            request_id: 1,
            user: 99,
            username: None,
            language: Language::English,
            direction: Direction::Buy,
            asset: Asset::new("BTC"),
            amount: Amount::new(dec!(1)).unwrap(),
            quote: Quote {
                price: dec!(60000),
                base: dec!(60000),
                fee: dec!(1800),
                total: dec!(61800),
            },
            payout_wallet: WALLET.to_string(),
        };
        assert!(workflow.registry().submit(stale).await);
        walk_to_receipt(&workflow, 12, "Buy").await;

        assert_eq!(
            workflow
                .handle_message(12, None, UserInput::Image(Vec::new()))
                .await,
            SessionState::AwaitingReceipt
        );
        assert_eq!(
            transport.replies_for(12).await.last(),
            Some(&Reply::ReviewUnavailable)
        );
        assert!(sink.records().await.is_empty());
        assert_eq!(workflow.registry().len().await, 1);
        assert_eq!(workflow.session(12).await.unwrap().retry_count, 0);
    }
}
