//! The request/response surface used by every transport.
//!
//! Each operation takes the acting user's id explicitly, resolves it against
//! the user table, and runs authorization before anything else.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::categorize::{normalize_category, Categorizer};
use crate::db::{self, Database};
use crate::error::{Result, TicketError};
use crate::filter::{self, FilterSpec};
use crate::lifecycle::{self, CreateTicketRequest, UpdateTicketRequest};
use crate::models::{Role, Status, Ticket, User};
use crate::policy;
use crate::stats::{self, Dashboard, Stats};

pub struct HelpDesk {
    db: Database,
    categorizer: Box<dyn Categorizer>,
}

impl HelpDesk {
    pub fn new(db: Database, categorizer: Box<dyn Categorizer>) -> Self {
        Self { db, categorizer }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn actor(&self, actor_id: i64) -> Result<User> {
        self.db.get_user(actor_id)?.ok_or_else(|| {
            TicketError::unauthorized(format!("Unknown user #{}", actor_id))
        })
    }

    /// Tickets `actor` may see, before criteria filtering. Reporters are
    /// scoped in the query itself.
    fn authorized_tickets(&self, actor: &User) -> Result<Vec<Ticket>> {
        let scope = match actor.role {
            Role::Admin => None,
            Role::Reporter => Some(actor.id),
        };
        self.db.list_tickets(scope)
    }

    /// `POST /tickets`
    pub fn create_ticket(&self, actor_id: i64, req: &CreateTicketRequest) -> Result<Ticket> {
        let actor = self.actor(actor_id)?;
        let new = lifecycle::validate_new_ticket(&actor, req).inspect_err(|e| {
            warn!(actor = actor.id, kind = e.kind().as_str(), "create rejected: {}", e);
        })?;

        let ticket = self
            .db
            .write(|conn| db::insert_ticket(conn, &new, &actor, Utc::now()))?;
        info!(
            ticket = ticket.id,
            reporter = actor.id,
            priority = %ticket.priority,
            "ticket created"
        );
        Ok(ticket)
    }

    /// `GET /tickets?status=&priority=&assigned_admin=&reporter=`
    pub fn list_tickets(&self, actor_id: i64, spec: &FilterSpec) -> Result<Vec<Ticket>> {
        let actor = self.actor(actor_id)?;
        let tickets = self.authorized_tickets(&actor)?;
        let matched = filter::apply_filters(tickets, spec);
        let visible = filter::visible_to(&actor, matched);
        debug!(actor = actor.id, count = visible.len(), "listed tickets");
        Ok(visible)
    }

    /// `GET /tickets/{id}`
    pub fn get_ticket(&self, actor_id: i64, id: i64) -> Result<Ticket> {
        let actor = self.actor(actor_id)?;
        let ticket = self
            .db
            .get_ticket(id)?
            .ok_or_else(|| TicketError::ticket_not_found(id))?;
        policy::ensure_can_view(&actor, &ticket)?;
        Ok(ticket)
    }

    /// `PUT /tickets/{id}`
    pub fn update_ticket(
        &self,
        actor_id: i64,
        id: i64,
        req: &UpdateTicketRequest,
    ) -> Result<Ticket> {
        let actor = self.actor(actor_id)?;
        policy::ensure_can_mutate_tickets(&actor).inspect_err(|e| {
            warn!(actor = actor.id, ticket = id, "update rejected: {}", e);
        })?;

        let result = self.db.write(|conn| {
            let current =
                db::fetch_ticket(conn, id)?.ok_or_else(|| TicketError::ticket_not_found(id))?;
            let before = current.clone();
            let updated = lifecycle::update_ticket(
                &actor,
                current,
                req,
                |user_id| db::fetch_user(conn, user_id),
                Utc::now(),
            )?;
            if updated != before {
                db::save_ticket(conn, &updated)?;
            }
            Ok(updated)
        });

        match &result {
            Ok(ticket) => info!(
                actor = actor.id,
                ticket = ticket.id,
                status = %ticket.status,
                assigned_admin = ?ticket.assigned_admin_id(),
                "ticket updated"
            ),
            Err(e) => warn!(
                actor = actor.id,
                ticket = id,
                kind = e.kind().as_str(),
                "update rejected: {}",
                e
            ),
        }
        result
    }

    pub fn close_ticket(&self, actor_id: i64, id: i64) -> Result<Ticket> {
        self.set_status(actor_id, id, Status::Closed)
    }

    pub fn reopen_ticket(&self, actor_id: i64, id: i64) -> Result<Ticket> {
        self.set_status(actor_id, id, Status::Open)
    }

    fn set_status(&self, actor_id: i64, id: i64, status: Status) -> Result<Ticket> {
        let req = UpdateTicketRequest {
            status: Some(status.to_string()),
            ..UpdateTicketRequest::default()
        };
        self.update_ticket(actor_id, id, &req)
    }

    /// `POST /tickets/{id}/analyze`
    ///
    /// The categorizer runs outside the write transaction; the result is
    /// written back against a fresh read of the ticket.
    pub fn analyze_ticket(&self, actor_id: i64, id: i64) -> Result<Ticket> {
        let actor = self.actor(actor_id)?;
        policy::ensure_can_mutate_tickets(&actor)?;
        let ticket = self
            .db
            .get_ticket(id)?
            .ok_or_else(|| TicketError::ticket_not_found(id))?;

        let category = self
            .categorizer
            .categorize(&ticket.title, &ticket.description)
            .and_then(|raw| normalize_category(&raw))
            .map_err(|e| {
                warn!(ticket = id, "categorization failed: {}", e);
                TicketError::AnalysisFailed(e)
            })?;

        let updated = self.db.write(|conn| {
            let current =
                db::fetch_ticket(conn, id)?.ok_or_else(|| TicketError::ticket_not_found(id))?;
            let updated = lifecycle::record_category(&actor, current, &category, Utc::now())?;
            db::save_ticket(conn, &updated)?;
            Ok(updated)
        })?;
        info!(ticket = id, category = %category, "ticket categorized");
        Ok(updated)
    }

    /// `GET /stats`
    pub fn stats(&self, actor_id: i64) -> Result<Stats> {
        let actor = self.actor(actor_id)?;
        let tickets = filter::visible_to(&actor, self.authorized_tickets(&actor)?);
        Ok(stats::compute_stats(&tickets))
    }

    pub fn dashboard(&self, actor_id: i64) -> Result<Dashboard> {
        let actor = self.actor(actor_id)?;
        let tickets = filter::visible_to(&actor, self.authorized_tickets(&actor)?);
        Ok(stats::dashboard(&tickets))
    }

    /// `GET /users`
    pub fn users(&self) -> Result<Vec<User>> {
        self.db.list_users()
    }
}
