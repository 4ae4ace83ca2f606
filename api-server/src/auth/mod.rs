//! Accounts and bearer sessions

mod store;

pub use store::{
    AccountChanges, AuthClaims, AuthError, AuthSession, AuthStore, ClientInfo, Registration,
    SessionSummary, UserSummary,
};
