/*!
 * Authorized token extractor
 *
 * Responsibility:
 * - Hand the token authorized by the keystone middleware to handlers
 * - The type itself lives in services::auth so the gate does not depend on api
 *
 * Public API:
 * - Token
 * - TokenExtractor
 */

mod core;

pub use crate::services::auth::Token;
pub use self::core::TokenExtractor;
