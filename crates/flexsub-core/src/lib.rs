pub mod api;
pub mod desired_state;
pub mod error;
pub mod event;
pub mod outcome;
pub mod properties;
pub mod request;

pub use api::{
    DatabaseList, DatabaseSummary, Link, PROCESSING_ERROR, ResourceId, Subscription,
    SubscriptionList, SubscriptionStatus, TaskState, contains_processing_error, processing_link,
};
pub use desired_state::{BASE_URL_PROPERTY, DesiredState, base_url};
pub use error::{CoreError, Result};
pub use event::{CfnRequest, RequestType};
pub use outcome::{CallbackResponse, Envelope, OutputData, PriorOutputs, ResponseStatus, StateError};
pub use properties::Properties;
pub use request::{CreateSubscriptionRequest, UpdateSubscriptionRequest};
