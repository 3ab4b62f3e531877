pub mod factory;
pub mod gate;
pub mod identity;
pub mod token;
pub mod validator;

pub use factory::build_token_gate;
pub use gate::{AuthorityFailurePolicy, Decision, DenyReason, GatePolicy, TokenGate};
pub use identity::IdentityValidator;
pub use token::Token;
pub use validator::{TokenValidator, ValidateError};
