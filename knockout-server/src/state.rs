use std::ops::Deref;
use std::sync::Arc;

use crate::auth::Authorization;
use crate::config::StoreKind;
use crate::signal::Shutdown;
use crate::store::Store;
use crate::{Config, Error};

#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    pub fn new(config: Config) -> Result<Self, Error> {
        let auth = Authorization::from_config(&config.authorization)?;

        let store = match config.store {
            StoreKind::Memory => Store::memory(),
            StoreKind::Mysql => Store::mysql(&config.database)?,
        };

        Ok(Self(Arc::new(StateInner {
            store,
            shutdown: Shutdown::new(),
            auth,
        })))
    }
}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub store: Store,
    pub shutdown: Shutdown,
    pub auth: Authorization,
}

#[cfg(test)]
mod tests {
    use super::State;
    use crate::{Config, Error};

    #[test]
    fn test_state_requires_secret() {
        assert!(matches!(
            State::new(Config::default()),
            Err(Error::EmptySecret)
        ));

        let mut config = Config::default();
        config.authorization.secret = String::from("secret");
        State::new(config).unwrap();
    }
}
