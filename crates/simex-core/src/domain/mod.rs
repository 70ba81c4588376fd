//! Domain model (ids, kinds, lifecycles, records, events).

pub mod errors;
pub mod events;
pub mod ids;
pub mod intent;
pub mod kind;
pub mod prediction;
pub mod record;
pub mod state;
pub mod wallet;

pub use self::errors::{PipelineError, StoreError, TransitionError};
pub use self::events::TaskEvent;
pub use self::ids::{Id, IdMarker};
pub use self::intent::{Intent, IntentId, IntentInput, IntentOutcome, RiskLevel, RoutePreview};
pub use self::kind::{Kind, Lifecycle, TaskKind, TaskRef};
pub use self::prediction::{
    FieldSpec, FieldType, ModelKind, ModelSpec, Prediction, PredictionId, PredictionInput,
    PredictionOutcome, Verdict,
};
pub use self::record::TaskRecord;
pub use self::state::{IntentState, PredictionState, TransactionState};
pub use self::wallet::{
    ModuleId, ModuleRegistry, TransactionId, TransactionInput, TransactionKind,
    TransactionReceipt, WalletModule, WalletTransaction,
};
