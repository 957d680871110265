pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod issuer;
pub mod roles;

pub use claims::Claims;
pub use codec::{TokenCodec, TOKEN_ALGORITHM};
pub use config::{SigningSecret, TokenConfig};
pub use error::{AuthError, AuthResult};
pub use extractors::{parse_bearer, AuthContext};
pub use issuer::{IssuedToken, TokenIssuer};
pub use roles::{ALLOWED_ROLES, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_STAFF};
