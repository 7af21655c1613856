//! Submission and moderation workflow.
//!
//! [`Directory`] is the only thing the HTTP layer talks to. Every method is
//! blocking (it goes straight to the record store), so handlers call it from
//! `spawn_blocking`. Moderator operations take a [`ModeratorSession`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use townboard_shared::constants::{MAX_EXTEND_DAYS, MAX_STARS, MIN_STARS};
use townboard_shared::expiry::expires_on;
use townboard_shared::{
    awaiting_review, newest_first, public_view, ApprovalStatus, Clock, DomainError, MediaKind,
    Moderated, RatingTarget, RecordId, ResidentType, TableKind, TicketStatus, VisibilityWindow,
};
use townboard_store::record::{columns, split_links};
use townboard_store::{
    Listing, Member, Rating, Record, ShowcaseItem, StoreError, TableReport, Tables, Ticket,
    Transition, Vendor,
};

use crate::auth::ModeratorSession;
use crate::error::ServerError;

pub type Result<T> = std::result::Result<T, ServerError>;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewMember {
    pub resident_type: ResidentType,
    pub phase: String,
    pub wing: String,
    pub unit: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewListing {
    pub email: String,
    pub business_name: String,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub contact: String,
    /// Each entry may itself hold several comma-separated links.
    pub images: Vec<String>,
    pub duration_days: VisibilityWindow,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewVendor {
    pub email: String,
    pub vendor_name: String,
    pub category: String,
    pub service: String,
    pub description: String,
    pub contact: String,
    pub images: Vec<String>,
    pub duration_days: VisibilityWindow,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewShowcase {
    pub title: String,
    pub media_kind: MediaKind,
    pub media_url: String,
    pub posted_by: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewRating {
    pub target_kind: Option<RatingTarget>,
    pub target_id: String,
    pub stars: i64,
    pub comment: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTicket {
    pub email: String,
    pub subject: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Aggregate of every valid star value for one target.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RatingSummary {
    pub count: usize,
    pub mean: f64,
}

impl RatingSummary {
    /// `None` when the target has no readable ratings.
    pub fn of(ratings: &[Rating], target: RatingTarget, id: &RecordId) -> Option<Self> {
        let stars: Vec<u8> = ratings
            .iter()
            .filter(|r| r.is_for(target, id))
            .filter_map(|r| r.stars)
            .collect();
        if stars.is_empty() {
            return None;
        }
        let total: u32 = stars.iter().map(|s| u32::from(*s)).sum();
        Some(Self {
            count: stars.len(),
            mean: f64::from(total) / stars.len() as f64,
        })
    }
}

/// A public record together with its rating summary.
#[derive(Debug, Clone, Serialize)]
pub struct Rated<T> {
    #[serde(flatten)]
    pub record: T,
    pub rating: Option<RatingSummary>,
}

/// Moderation triage list for one table.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "lowercase")]
pub enum Queue {
    Members(Vec<Member>),
    Listings(Vec<Listing>),
    Vendors(Vec<Vendor>),
    Showcase(Vec<ShowcaseItem>),
}

impl Queue {
    pub fn len(&self) -> usize {
        match self {
            Queue::Members(rows) => rows.len(),
            Queue::Listings(rows) => rows.len(),
            Queue::Vendors(rows) => rows.len(),
            Queue::Showcase(rows) => rows.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct Directory {
    tables: Arc<Tables>,
    clock: Arc<dyn Clock>,
    ratings_one_per_rater: bool,
}

impl Directory {
    pub fn new(tables: Arc<Tables>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tables,
            clock,
            ratings_one_per_rater: false,
        }
    }

    pub fn with_one_rating_per_rater(mut self, enabled: bool) -> Self {
        self.ratings_one_per_rater = enabled;
        self
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Whether some member row with this email is approved. A blank or
    /// unknown email is simply not approved.
    pub fn is_approved_member(&self, email: &str) -> Result<bool> {
        if email.trim().is_empty() {
            return Ok(false);
        }
        let members: Vec<Member> = self.tables.load()?;
        Ok(members
            .iter()
            .any(|m| m.email_matches(email) && m.is_approved()))
    }

    pub fn register_member(&self, payload: NewMember) -> Result<Member> {
        let member = Member {
            id: RecordId::new(),
            created_at: Some(self.clock.now()),
            status: ApprovalStatus::Pending,
            resident_type: payload.resident_type,
            phase: payload.phase.trim().to_string(),
            wing: payload.wing.trim().to_string(),
            unit: payload.unit.trim().to_string(),
            name: required(&payload.name, "name")?,
            email: required(&payload.email, "email")?,
            phone: payload.phone.trim().to_string(),
        };
        self.tables.append(&member)?;
        info!(id = %member.id, email = %member.email, "Member registration received");
        Ok(member)
    }

    fn require_member(&self, email: &str, kind: TableKind) -> Result<()> {
        if self.is_approved_member(email)? {
            return Ok(());
        }
        warn!(email, %kind, "Submission refused: not an approved member");
        Err(ServerError::NotAuthorized(format!(
            "{email} is not an approved member; only approved members may submit {kind}"
        )))
    }

    // ------------------------------------------------------------------
    // Listings and vendors
    // ------------------------------------------------------------------

    pub fn submit_listing(&self, payload: NewListing) -> Result<Listing> {
        let listing = self.new_listing(payload)?;
        self.require_member(&listing.email, TableKind::Listings)?;
        self.tables.append(&listing)?;
        info!(id = %listing.id, email = %listing.email, "Listing submitted");
        Ok(listing)
    }

    pub fn submit_vendor(&self, payload: NewVendor) -> Result<Vendor> {
        let vendor = self.new_vendor(payload)?;
        self.require_member(&vendor.email, TableKind::Vendors)?;
        self.tables.append(&vendor)?;
        info!(id = %vendor.id, email = %vendor.email, "Vendor submitted");
        Ok(vendor)
    }

    /// Moderator-entered listing for an email that need not belong to an
    /// approved member. The record still starts Pending.
    pub fn submit_listing_on_behalf(
        &self,
        session: &ModeratorSession,
        payload: NewListing,
    ) -> Result<Listing> {
        let listing = self.new_listing(payload)?;
        warn!(
            moderator = session.username(),
            email = %listing.email,
            id = %listing.id,
            "Listing submitted on behalf, member check skipped"
        );
        self.tables.append(&listing)?;
        Ok(listing)
    }

    pub fn submit_vendor_on_behalf(
        &self,
        session: &ModeratorSession,
        payload: NewVendor,
    ) -> Result<Vendor> {
        let vendor = self.new_vendor(payload)?;
        warn!(
            moderator = session.username(),
            email = %vendor.email,
            id = %vendor.id,
            "Vendor submitted on behalf, member check skipped"
        );
        self.tables.append(&vendor)?;
        Ok(vendor)
    }

    fn new_listing(&self, payload: NewListing) -> Result<Listing> {
        let days = payload.duration_days.days();
        Ok(Listing {
            id: RecordId::new(),
            created_at: Some(self.clock.now()),
            status: ApprovalStatus::Pending,
            email: required(&payload.email, "email")?,
            business_name: required(&payload.business_name, "business_name")?,
            category: payload.category.trim().to_string(),
            subcategory: payload.subcategory.trim().to_string(),
            description: required(&payload.description, "description")?,
            contact: payload.contact.trim().to_string(),
            images: links(&payload.images),
            duration_days: Some(days),
            expires_on: expires_on(self.clock.today(), days),
        })
    }

    fn new_vendor(&self, payload: NewVendor) -> Result<Vendor> {
        let days = payload.duration_days.days();
        Ok(Vendor {
            id: RecordId::new(),
            created_at: Some(self.clock.now()),
            status: ApprovalStatus::Pending,
            email: required(&payload.email, "email")?,
            vendor_name: required(&payload.vendor_name, "vendor_name")?,
            category: payload.category.trim().to_string(),
            service: payload.service.trim().to_string(),
            description: required(&payload.description, "description")?,
            contact: payload.contact.trim().to_string(),
            images: links(&payload.images),
            duration_days: Some(days),
            expires_on: expires_on(self.clock.today(), days),
        })
    }

    /// Approved, unexpired listings, newest first, optionally filtered by a
    /// case-insensitive search. A store failure yields an empty list.
    pub fn public_listings(&self, search: Option<&str>) -> Vec<Rated<Listing>> {
        let rows = degrade(TableKind::Listings, self.tables.load::<Listing>());
        let mut visible = public_view(rows, true, self.clock.today());
        visible.retain(|l| {
            matches_search(
                search,
                &[&l.business_name, &l.category, &l.subcategory, &l.description],
            )
        });
        newest_first(&mut visible);

        let ratings = degrade(TableKind::Ratings, self.tables.load::<Rating>());
        visible
            .into_iter()
            .map(|l| Rated {
                rating: RatingSummary::of(&ratings, RatingTarget::Listing, &l.id),
                record: l,
            })
            .collect()
    }

    pub fn public_vendors(&self, search: Option<&str>) -> Vec<Rated<Vendor>> {
        let rows = degrade(TableKind::Vendors, self.tables.load::<Vendor>());
        let mut visible = public_view(rows, true, self.clock.today());
        visible.retain(|v| {
            matches_search(
                search,
                &[&v.vendor_name, &v.category, &v.service, &v.description],
            )
        });
        newest_first(&mut visible);

        let ratings = degrade(TableKind::Ratings, self.tables.load::<Rating>());
        visible
            .into_iter()
            .map(|v| Rated {
                rating: RatingSummary::of(&ratings, RatingTarget::Vendor, &v.id),
                record: v,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Showcase
    // ------------------------------------------------------------------

    pub fn public_showcase(&self) -> Vec<ShowcaseItem> {
        let rows = degrade(TableKind::Showcase, self.tables.load::<ShowcaseItem>());
        let mut visible = public_view(rows, false, self.clock.today());
        newest_first(&mut visible);
        visible
    }

    pub fn submit_showcase(&self, payload: NewShowcase) -> Result<ShowcaseItem> {
        let item = self.new_showcase(payload, ApprovalStatus::Pending)?;
        self.tables.append(&item)?;
        info!(id = %item.id, "Showcase item submitted");
        Ok(item)
    }

    /// Moderator post, visible immediately.
    pub fn post_showcase(&self, session: &ModeratorSession, payload: NewShowcase) -> Result<ShowcaseItem> {
        let item = self.new_showcase(payload, ApprovalStatus::Approved)?;
        self.tables.append(&item)?;
        info!(id = %item.id, moderator = session.username(), "Showcase item posted");
        Ok(item)
    }

    fn new_showcase(&self, payload: NewShowcase, status: ApprovalStatus) -> Result<ShowcaseItem> {
        Ok(ShowcaseItem {
            id: RecordId::new(),
            created_at: Some(self.clock.now()),
            status,
            title: required(&payload.title, "title")?,
            media_kind: payload.media_kind,
            media_url: required(&payload.media_url, "media_url")?,
            posted_by: payload.posted_by.trim().to_string(),
            notes: payload.notes.trim().to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    /// Record a rating for a publicly visible listing or vendor.
    pub fn rate(&self, payload: NewRating) -> Result<Rating> {
        let target = payload
            .target_kind
            .ok_or(DomainError::MissingField("target_kind"))?;
        let target_id = RecordId::from(required(&payload.target_id, "target_id")?);
        let email = required(&payload.email, "email")?;
        let stars = u8::try_from(payload.stars)
            .ok()
            .filter(|s| (MIN_STARS..=MAX_STARS).contains(s))
            .ok_or(DomainError::InvalidStars(payload.stars))?;

        if !self.is_public(target, &target_id)? {
            return Err(ServerError::NotFound(format!(
                "No public {} with ID {target_id}",
                target.as_str()
            )));
        }

        if self.ratings_one_per_rater {
            let ratings: Vec<Rating> = self.tables.load()?;
            let duplicate = ratings
                .iter()
                .any(|r| r.is_for(target, &target_id) && r.email.eq_ignore_ascii_case(&email));
            if duplicate {
                return Err(ServerError::Conflict(format!(
                    "{email} has already rated this {}",
                    target.as_str()
                )));
            }
        }

        let rating = Rating {
            created_at: Some(self.clock.now()),
            target: Some(target),
            target_id,
            stars: Some(stars),
            comment: payload.comment.trim().to_string(),
            email,
        };
        self.tables.append(&rating)?;
        info!(kind = target.as_str(), id = %rating.target_id, stars, "Rating recorded");
        Ok(rating)
    }

    pub fn rating_summary(&self, target: RatingTarget, id: &RecordId) -> Result<Option<RatingSummary>> {
        let ratings: Vec<Rating> = self.tables.load()?;
        Ok(RatingSummary::of(&ratings, target, id))
    }

    fn is_public(&self, target: RatingTarget, id: &RecordId) -> Result<bool> {
        let today = self.clock.today();
        let found = match target {
            RatingTarget::Listing => public_view(self.tables.load::<Listing>()?, true, today)
                .iter()
                .any(|l| id.matches(l.id.as_str())),
            RatingTarget::Vendor => public_view(self.tables.load::<Vendor>()?, true, today)
                .iter()
                .any(|v| id.matches(v.id.as_str())),
        };
        Ok(found)
    }

    // ------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------

    pub fn submit_ticket(&self, payload: NewTicket) -> Result<Ticket> {
        let ticket = Ticket {
            id: RecordId::new(),
            created_at: Some(self.clock.now()),
            email: required(&payload.email, "email")?,
            subject: required(&payload.subject, "subject")?,
            message: required(&payload.message, "message")?,
            status: TicketStatus::Open,
        };
        self.tables.append(&ticket)?;
        info!(id = %ticket.id, email = %ticket.email, "Ticket opened");
        Ok(ticket)
    }

    /// Every ticket, newest first.
    pub fn list_tickets(&self, _session: &ModeratorSession) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self.tables.load()?;
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    pub fn close_ticket(&self, session: &ModeratorSession, id: &RecordId) -> Result<()> {
        self.tables.update_field(
            TableKind::Tickets,
            id,
            columns::STATUS,
            TicketStatus::Closed.as_str(),
        )?;
        info!(%id, moderator = session.username(), "Ticket closed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Moderation
    // ------------------------------------------------------------------

    /// Every row of `kind` that is not approved, rejected ones included,
    /// newest first.
    pub fn pending_queue(&self, _session: &ModeratorSession, kind: TableKind) -> Result<Queue> {
        Ok(match kind {
            TableKind::Members => Queue::Members(self.review()?),
            TableKind::Listings => Queue::Listings(self.review()?),
            TableKind::Vendors => Queue::Vendors(self.review()?),
            TableKind::Showcase => Queue::Showcase(self.review()?),
            TableKind::Ratings | TableKind::Tickets => {
                return Err(DomainError::NotModerated(kind).into())
            }
        })
    }

    fn review<R: Record + Moderated>(&self) -> Result<Vec<R>> {
        let mut rows = awaiting_review(self.tables.load::<R>()?);
        newest_first(&mut rows);
        Ok(rows)
    }

    pub fn approve(&self, session: &ModeratorSession, kind: TableKind, id: &RecordId) -> Result<Transition> {
        let transition = self.tables.approve(kind, id, self.clock.today())?;
        info!(%kind, %id, moderator = session.username(), "Moderator approved record");
        Ok(transition)
    }

    pub fn reject(&self, session: &ModeratorSession, kind: TableKind, id: &RecordId) -> Result<Transition> {
        let transition = self.tables.reject(kind, id)?;
        info!(%kind, %id, moderator = session.username(), "Moderator rejected record");
        Ok(transition)
    }

    /// Extend by `days`, which must lie in `0..=365`.
    pub fn extend(
        &self,
        session: &ModeratorSession,
        kind: TableKind,
        id: &RecordId,
        days: i64,
    ) -> Result<chrono::NaiveDate> {
        if !(0..=MAX_EXTEND_DAYS).contains(&days) {
            return Err(DomainError::InvalidValue {
                field: "days",
                value: days.to_string(),
            }
            .into());
        }
        let date = self.tables.extend(kind, id, days, self.clock.today())?;
        info!(%kind, %id, days, moderator = session.username(), "Moderator extended record");
        Ok(date)
    }

    /// Table names, headers and row counts as the store currently has them.
    pub fn table_report(&self, _session: &ModeratorSession) -> Result<Vec<TableReport>> {
        Ok(self.tables.probe()?)
    }
}

fn required(value: &str, field: &'static str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::MissingField(field).into());
    }
    Ok(value.to_string())
}

fn links(raw: &[String]) -> Vec<String> {
    raw.iter().flat_map(|entry| split_links(entry)).collect()
}

fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    let needle = match search.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => return true,
    };
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

fn degrade<T>(kind: TableKind, result: std::result::Result<Vec<T>, StoreError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(table = kind.table_name(), error = %e, "Public read failed, showing nothing");
        Vec::new()
    })
}
