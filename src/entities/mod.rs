//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod batch_recipient;
pub mod communication;
pub mod debtor;
pub mod installment;
pub mod payment_plan;
pub mod scheduled_batch;
pub mod user;

// Re-export specific types to avoid conflicts
pub use batch_recipient::{
    Column as BatchRecipientColumn, Entity as BatchRecipient, Model as BatchRecipientModel,
};
pub use communication::{
    Column as CommunicationColumn, CommunicationType, Entity as Communication,
    Model as CommunicationModel,
};
pub use debtor::{Column as DebtorColumn, DebtorStatus, Entity as Debtor, Model as DebtorModel};
pub use installment::{
    Column as InstallmentColumn, Entity as Installment, Model as InstallmentModel,
};
pub use payment_plan::{
    Column as PaymentPlanColumn, Entity as PaymentPlan, Model as PaymentPlanModel,
};
pub use scheduled_batch::{
    BatchStatus, Column as ScheduledBatchColumn, Entity as ScheduledBatch,
    Model as ScheduledBatchModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
