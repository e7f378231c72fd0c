pub mod gateway;
pub mod initiator;
pub mod receipts;
pub mod reconciler;

pub use gateway::GatewayClient;
pub use initiator::PaymentInitiator;
pub use receipts::{InMemoryReceiptStore, ReceiptStore, ReceiptValidator};
pub use reconciler::StatusReconciler;
