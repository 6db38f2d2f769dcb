use std::sync::Arc;

use crate::store::TokenStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TokenStore>,
}

impl AppState {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self { store }
    }
}
