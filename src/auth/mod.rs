mod credentials;
mod middleware;
mod password;
mod reset;
mod token;

pub use credentials::CredentialService;
pub use middleware::{AuthError, RequireUser, extract_bearer_token};
pub use password::PasswordHasher;
pub use reset::ResetTokens;
pub use token::{AccessToken, AccessTokens, Claims, TOKEN_TYPE};
