/*
 * Responsibility
 * - GET /whoami (gated)
 * - Echo the token the gate authorized for this request
 */
use crate::api::v1::extractors::TokenExtractor;

pub async fn whoami(TokenExtractor(token): TokenExtractor) -> String {
    token.into_inner()
}
