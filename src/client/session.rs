//! Sesión del cliente
//!
//! Guarda el token bearer. Cada request toma una instantánea con la
//! generación de la sesión; un 401 solo invalida la generación que lo
//! recibió, así varias respuestas 401 concurrentes disparan un único logout.

use std::sync::{Arc, Mutex};

type LogoutHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub generation: u64,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    generation: u64,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    state: Arc<Mutex<SessionState>>,
    on_logout: Option<LogoutHook>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_token(token);
        store
    }

    /// Hook que se ejecuta al cerrar la sesión por un 401
    pub fn on_logout<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_logout = Some(Arc::new(hook));
        self
    }

    /// Abrir una sesión nueva
    pub fn set_token(&self, token: impl Into<String>) {
        let mut state = self.lock();
        state.token = Some(token.into());
        state.generation += 1;
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            token: state.token.clone(),
            generation: state.generation,
        }
    }

    /// Invalidar la sesión vista por un request que recibió 401.
    ///
    /// Devuelve `true` solo para la llamada que efectivamente cerró la sesión.
    pub fn invalidate(&self, seen: &SessionSnapshot) -> bool {
        let closed = {
            let mut state = self.lock();
            if state.generation == seen.generation && state.token.is_some() {
                state.token = None;
                state.generation += 1;
                true
            } else {
                false
            }
        };

        if closed {
            log::warn!("🔒 Sesión expirada, cerrando sesión");
            if let Some(hook) = &self.on_logout {
                hook();
            }
        }

        closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        // Ningún hilo entra en pánico con el candado tomado
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SessionStore")
            .field("authenticated", &state.token.is_some())
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_store() -> (SessionStore, Arc<AtomicUsize>) {
        let logouts = Arc::new(AtomicUsize::new(0));
        let counter = logouts.clone();
        let store = SessionStore::with_token("tok").on_logout(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (store, logouts)
    }

    #[test]
    fn test_stale_snapshots_do_not_logout_twice() {
        let (store, logouts) = counting_store();
        let first = store.snapshot();
        let second = store.snapshot();

        assert!(store.invalidate(&first));
        assert!(!store.invalidate(&second));
        assert_eq!(store.token(), None);
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_new_session_can_be_invalidated_again() {
        let (store, logouts) = counting_store();
        let old = store.snapshot();
        assert!(store.invalidate(&old));

        store.set_token("tok2");
        assert!(!store.invalidate(&old));
        assert_eq!(store.token().as_deref(), Some("tok2"));

        assert!(store.invalidate(&store.snapshot()));
        assert_eq!(logouts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_without_token_nothing_to_close() {
        let store = SessionStore::new();
        assert!(!store.invalidate(&store.snapshot()));
    }

    #[test]
    fn test_concurrent_invalidation_fires_once() {
        let (store, logouts) = counting_store();
        let seen = store.snapshot();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let seen = seen.clone();
                std::thread::spawn(move || store.invalidate(&seen))
            })
            .collect();
        let closed = handles.into_iter().map(|h| h.join().unwrap()).filter(|c| *c).count();

        assert_eq!(closed, 1);
        assert_eq!(logouts.load(Ordering::SeqCst), 1);
    }
}
