//! The process-singleton in-memory holder of the recovered root key.
//!
//! `RootKeyCustodian` is the only place the 32-byte root key lives in plain
//! form while Nexus is running (`spec.md` §4.2). It does not persist
//! anything and does not know how the key was recovered; `nexus-keeper`
//! calls [`RootKeyCustodian::install`] once bootstrap or recovery
//! completes, and `nexus-backend` calls [`RootKeyCustodian::with_key`] for
//! every row it encrypts or decrypts.

use parking_lot::RwLock;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use nexus_types::crypto::KEY_LEN;

/// Error returned when the custodian is asked to operate without a key in
/// place.
#[derive(Debug, thiserror::Error)]
#[error("root key custodian is locked")]
pub struct CustodianLocked;

/// Error returned by [`RootKeyCustodian::install`] when handed an all-zero
/// key.
#[derive(Debug, thiserror::Error)]
#[error("refusing to install an all-zero root key")]
pub struct NilRootKey;

/// Holds the recovered root key (or nothing) behind a `RwLock`, zeroizing
/// whatever it held whenever it is replaced or dropped.
///
/// An all-zero key is never a valid state for the custodian to be in: it is
/// used internally only as the "no key installed" sentinel, which is why
/// [`install`](Self::install) rejects it outright rather than let it slip
/// in as if it were real key material.
pub struct RootKeyCustodian {
    key: RwLock<[u8; KEY_LEN]>,
}

impl Default for RootKeyCustodian {
    fn default() -> Self {
        Self::new()
    }
}

impl RootKeyCustodian {
    /// Builds a custodian in the locked (no key installed) state.
    pub fn new() -> Self {
        Self {
            key: RwLock::new([0u8; KEY_LEN]),
        }
    }

    /// Returns `true` iff no key is currently installed.
    ///
    /// The check is constant-time so that probing this method cannot be
    /// used as a side channel on the key's bytes.
    pub fn is_zero(&self) -> bool {
        let guard = self.key.read();
        guard.ct_eq(&[0u8; KEY_LEN]).into()
    }

    /// Installs `key` as the current root key, zeroizing whatever was
    /// previously held.
    ///
    /// Panics are not used here on bad input: [`NilRootKey`] is returned
    /// instead, since recovery and bootstrap flows must be able to treat a
    /// corrupt reconstruction as an ordinary fatal error rather than a
    /// process abort.
    pub fn install(&self, mut key: [u8; KEY_LEN]) -> Result<(), NilRootKey> {
        if bool::from(key.ct_eq(&[0u8; KEY_LEN])) {
            key.zeroize();
            return Err(NilRootKey);
        }
        let mut guard = self.key.write();
        guard.zeroize();
        *guard = key;
        key.zeroize();
        Ok(())
    }

    /// Acquires the custodian's write lock, returning a guard that derefs to
    /// the raw key bytes.
    ///
    /// `spec.md` §4.2's explicit write-lock acquire/release pair, for the
    /// rare producer that must hand a raw pointer into the key to a
    /// downstream API (for example `nexus-keeper`'s redistribution flow,
    /// which passes the key into [`crate::shamir::split`]). The returned
    /// guard must be released with [`unlock_raw`](Self::unlock_raw) —
    /// unbalanced pairing (dropping it any other way, or never calling
    /// `lock_raw` at all) is a programmer error, not a recoverable
    /// condition. Prefer [`with_key`](Self::with_key) wherever a raw pointer
    /// isn't actually required.
    pub fn lock_raw(&self) -> parking_lot::RwLockWriteGuard<'_, [u8; KEY_LEN]> {
        self.key.write()
    }

    /// Releases a guard acquired via [`lock_raw`](Self::lock_raw).
    pub fn unlock_raw(&self, guard: parking_lot::RwLockWriteGuard<'_, [u8; KEY_LEN]>) {
        drop(guard);
    }

    /// Runs `f` with a borrow of the installed key, or returns
    /// [`CustodianLocked`] without calling `f` if none is installed.
    ///
    /// This is the preferred access path: the key never leaves the lock
    /// guard's scope, so callers cannot accidentally retain a copy past the
    /// point the custodian is next locked.
    pub fn with_key<R>(
        &self,
        f: impl FnOnce(&[u8; KEY_LEN]) -> R,
    ) -> Result<R, CustodianLocked> {
        let guard = self.key.read();
        if bool::from(guard.ct_eq(&[0u8; KEY_LEN])) {
            return Err(CustodianLocked);
        }
        Ok(f(&guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_locked() {
        let custodian = RootKeyCustodian::new();
        assert!(custodian.is_zero());
        assert!(custodian.with_key(|_| ()).is_err());
    }

    #[test]
    fn install_then_read() {
        let custodian = RootKeyCustodian::new();
        custodian.install([7u8; KEY_LEN]).unwrap();
        assert!(!custodian.is_zero());
        custodian.with_key(|k| assert_eq!(k, &[7u8; KEY_LEN])).unwrap();
    }

    #[test]
    fn install_rejects_all_zero_key() {
        let custodian = RootKeyCustodian::new();
        assert!(custodian.install([0u8; KEY_LEN]).is_err());
        assert!(custodian.is_zero());
    }

    #[test]
    fn reinstall_replaces_previous_key() {
        let custodian = RootKeyCustodian::new();
        custodian.install([1u8; KEY_LEN]).unwrap();
        custodian.install([2u8; KEY_LEN]).unwrap();
        custodian.with_key(|k| assert_eq!(k, &[2u8; KEY_LEN])).unwrap();
    }

    #[test]
    fn lock_raw_and_unlock_raw_are_paired() {
        let custodian = RootKeyCustodian::new();
        custodian.install([9u8; KEY_LEN]).unwrap();
        let guard = custodian.lock_raw();
        assert_eq!(*guard, [9u8; KEY_LEN]);
        custodian.unlock_raw(guard);
        custodian.with_key(|k| assert_eq!(k, &[9u8; KEY_LEN])).unwrap();
    }
}
