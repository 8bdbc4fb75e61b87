// Protected handlers: every route here sits behind the JWT middleware

pub mod ledger;
pub mod resource;
pub mod users;

use crate::schema::ResourceDef;

/// Resource served by a route, attached as a request extension
#[derive(Debug, Clone, Copy)]
pub struct ResourceRef(pub &'static ResourceDef);
