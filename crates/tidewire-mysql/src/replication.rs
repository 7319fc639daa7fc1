//! Read/write splitting over a primary session and a replica-pool session.
//!
//! All work goes through whichever session is active. Switching copies the
//! catalog, autocommit mode and isolation level onto the incoming session
//! before the switch becomes visible. Liveness probes and identity changes
//! always reach both sessions.

use std::sync::Mutex;

use tidewire_core::{
    Connection, IsolationLevel, Result, ServerVersion, Session, SessionContext,
};

/// Which of the two sessions currently receives traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSide {
    Primary,
    Replica,
}

/// A session that routes to a primary or a replica pool.
#[derive(Debug)]
pub struct ReplicaAwareSession<S: Session> {
    primary: S,
    replicas: S,
    active: Mutex<ActiveSide>,
}

impl<S: Session> ReplicaAwareSession<S> {
    /// Start on the primary.
    pub fn new(primary: S, replicas: S) -> Self {
        Self {
            primary,
            replicas,
            active: Mutex::new(ActiveSide::Primary),
        }
    }

    pub fn primary(&self) -> &S {
        &self.primary
    }

    pub fn replicas(&self) -> &S {
        &self.replicas
    }

    fn side(&self, side: ActiveSide) -> &S {
        match side {
            ActiveSide::Primary => &self.primary,
            ActiveSide::Replica => &self.replicas,
        }
    }

    pub fn active_side(&self) -> ActiveSide {
        match self.active.lock() {
            Ok(side) => *side,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// The session currently receiving traffic.
    pub fn active(&self) -> &S {
        self.side(self.active_side())
    }

    pub fn is_primary_active(&self) -> bool {
        self.active_side() == ActiveSide::Primary
    }

    /// Make `to` active, carrying the transactional context over first.
    ///
    /// The caller holds the lock, so no other thread can route through a
    /// half-prepared target.
    fn swap(&self, active: &mut ActiveSide, to: ActiveSide) -> Result<()> {
        if *active == to {
            return Ok(());
        }
        let from = *active;
        let source = self.side(from);
        let target = self.side(to);

        let catalog = source.catalog()?;
        if target.catalog()? != catalog {
            target.set_catalog(catalog.as_deref())?;
        }
        let auto_commit = source.auto_commit()?;
        if target.auto_commit()? != auto_commit {
            target.set_auto_commit(auto_commit)?;
        }
        let isolation = source.isolation()?;
        if target.isolation()? != isolation {
            target.set_isolation(isolation)?;
        }

        *active = to;
        tracing::info!(?from, ?to, "switched active session");
        Ok(())
    }

    /// Run `op` on both sessions; both are attempted and the primary's error
    /// wins when both fail.
    fn on_both(&self, what: &str, op: impl Fn(&S) -> Result<()>) -> Result<()> {
        let primary = op(&self.primary);
        let replica = op(&self.replicas);
        let active = self.active_side();
        match &primary {
            Err(e) if active != ActiveSide::Primary => {
                tracing::warn!(error = %e, what, "inactive primary session failed");
            }
            _ => {}
        }
        match &replica {
            Err(e) if active != ActiveSide::Replica => {
                tracing::warn!(error = %e, what, "inactive replica session failed");
            }
            _ => {}
        }
        primary.and(replica)
    }
}

impl<S: Session> SessionContext for ReplicaAwareSession<S> {
    fn catalog(&self) -> Result<Option<String>> {
        self.active().catalog()
    }

    fn set_catalog(&self, catalog: Option<&str>) -> Result<()> {
        self.active().set_catalog(catalog)
    }

    fn auto_commit(&self) -> Result<bool> {
        self.active().auto_commit()
    }

    fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        self.active().set_auto_commit(auto_commit)
    }

    fn isolation(&self) -> Result<IsolationLevel> {
        self.active().isolation()
    }

    fn set_isolation(&self, level: IsolationLevel) -> Result<()> {
        self.active().set_isolation(level)
    }
}

impl<S: Session> Connection for ReplicaAwareSession<S> {
    type Statement = S::Statement;

    /// Statements stay bound to the session that prepared them, even after a
    /// later switch.
    fn prepare(&self, sql: &str) -> Result<Self::Statement> {
        self.active().prepare(sql)
    }

    fn server_version(&self) -> ServerVersion {
        self.active().server_version()
    }

    fn identifier_quote(&self) -> Option<&str> {
        self.active().identifier_quote()
    }

    fn database(&self) -> Option<String> {
        self.active().database()
    }
}

impl<S: Session> Session for ReplicaAwareSession<S> {
    /// Read-only routes to the replica pool and forces it read-only;
    /// read-write routes back to the primary.
    #[tracing::instrument(level = "debug", skip(self))]
    fn set_read_only(&self, read_only: bool) -> Result<()> {
        let mut active = self.active.lock()?;
        if read_only {
            self.swap(&mut *active, ActiveSide::Replica)?;
            self.replicas.set_read_only(true)
        } else {
            self.swap(&mut *active, ActiveSide::Primary)
        }
    }

    fn is_read_only(&self) -> Result<bool> {
        match self.active_side() {
            ActiveSide::Replica => Ok(true),
            ActiveSide::Primary => self.primary.is_read_only(),
        }
    }

    fn commit(&self) -> Result<()> {
        self.active().commit()
    }

    fn rollback(&self) -> Result<()> {
        self.active().rollback()
    }

    /// Probe both sessions, whichever one is active.
    #[tracing::instrument(level = "trace", skip(self))]
    fn ping(&self) -> Result<()> {
        self.on_both("ping", <S as Session>::ping)
    }

    fn close(&self) -> Result<()> {
        self.on_both("close", <S as Session>::close)
    }

    fn is_closed(&self) -> bool {
        self.primary.is_closed() && self.replicas.is_closed()
    }

    fn change_user(&self, user: &str, password: Option<&str>) -> Result<()> {
        self.on_both("change_user", |s| s.change_user(user, password))
    }

    fn set_session_comment(&self, comment: Option<&str>) -> Result<()> {
        self.on_both("set_session_comment", |s| s.set_session_comment(comment))
    }
}
