pub mod tenant;

pub use tenant::{tenant_middleware, BRANCH_HEADER, ORGANIZATION_HEADER};
