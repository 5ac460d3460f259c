pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod utils;

pub use claims::{Claims, RefreshClaims};
pub use jwt::JwtService;
pub use middleware::AuthenticatedUser;
pub use password::{hash_password, verify_password};
pub use utils::{require_admin, require_owner, require_role};
