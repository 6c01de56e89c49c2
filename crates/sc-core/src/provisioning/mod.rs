//! Client/project provisioning: validity gate and state machine.

mod request;
mod state_machine;

pub use request::{
    normalize_client_name, ClientTarget, ProvisioningRequest, ProvisioningValidationError,
    ValidatedProvisioning,
};
pub use state_machine::{
    ProvisionedProject, ProvisioningAction, ProvisioningEvent, ProvisioningState,
    ProvisioningStateMachine,
};
