//! Domain types for Gatherly.
//!
//! Identifiers, the user and event documents with their embedded id lists,
//! and posts with votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a post
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(Uuid);

impl PostId {
    /// Creates a new random `PostId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PostId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Users
// ============================================================================

/// A user's display name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// First name
    pub first: String,
    /// Last name
    pub last: String,
}

impl PersonName {
    /// Creates a name from its parts
    #[must_use]
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
        }
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// A user document with its relationship lists
///
/// `followings`, `followers` and `blocked` are most-recent-first and never
/// contain the same id twice. A user never appears in its own `followings`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier, immutable after registration
    pub id: UserId,
    /// Display name
    pub name: PersonName,
    /// Contact email, unique across users
    pub email: String,
    /// Administrative privilege, set at registration
    pub is_admin: bool,
    /// Whether the account has been activated
    pub is_activated: bool,
    /// Company
    pub company: Option<String>,
    /// Personal website
    pub website: Option<String>,
    /// Location
    pub location: Option<String>,
    /// Free-form biography
    pub about: Option<String>,
    /// Users this user follows
    pub followings: Vec<UserId>,
    /// Users following this user
    pub followers: Vec<UserId>,
    /// Users this user has blocked
    pub blocked: Vec<UserId>,
    /// When the user registered
    pub created_at: DateTime<Utc>,
    /// Last profile or relationship change
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a freshly registered, not yet activated user
    #[must_use]
    pub fn new(
        id: UserId,
        name: PersonName,
        email: String,
        is_admin: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            is_admin,
            is_activated: false,
            company: None,
            website: None,
            location: None,
            about: None,
            followings: Vec::new(),
            followers: Vec::new(),
            blocked: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Whether this user follows `other`
    #[must_use]
    pub fn follows(&self, other: &UserId) -> bool {
        self.followings.contains(other)
    }

    /// Whether `other` follows this user
    #[must_use]
    pub fn is_followed_by(&self, other: &UserId) -> bool {
        self.followers.contains(other)
    }

    /// Whether this user has blocked `other`
    #[must_use]
    pub fn has_blocked(&self, other: &UserId) -> bool {
        self.blocked.contains(other)
    }

    /// Summary form used inside other users' resolved lists
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            first_name: self.name.first.clone(),
            last_name: self.name.last.clone(),
            email: self.email.clone(),
        }
    }
}

/// Id plus display fields, used when resolving relationship lists
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User identifier
    pub id: UserId,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Contact email
    pub email: String,
}

/// A user with relationship lists resolved to summaries
///
/// Ids that no longer resolve (deleted accounts) are left out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user document
    pub user: User,
    /// Resolved `followings`
    pub followings: Vec<UserSummary>,
    /// Resolved `followers`
    pub followers: Vec<UserSummary>,
    /// Resolved `blocked`
    pub blocked: Vec<UserSummary>,
}

/// Fields a user may change on their own profile
///
/// Anything else (admin flag, activation, relationship lists) is not
/// reachable through a profile update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    pub name: Option<PersonName>,
    /// New email
    pub email: Option<String>,
    /// New company
    pub company: Option<String>,
    /// New website
    pub website: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New biography
    pub about: Option<String>,
}

impl ProfileUpdate {
    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.company.is_none()
            && self.website.is_none()
            && self.location.is_none()
            && self.about.is_none()
    }
}

// ============================================================================
// Events and RSVPs
// ============================================================================

/// A user's response to an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsvpChoice {
    /// Attending
    Yes,
    /// Not attending
    No,
    /// Undecided
    Maybe,
}

impl RsvpChoice {
    /// All choices, in list order
    pub const ALL: [Self; 3] = [Self::Yes, Self::No, Self::Maybe];
}

impl fmt::Display for RsvpChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
            Self::Maybe => write!(f, "maybe"),
        }
    }
}

/// The three RSVP lists of an event, each in insertion order
///
/// `record` appends unconditionally; the single-response rule is enforced by
/// the event reducer. [`RsvpLists::violations`] reports any user that ended up
/// in more than one place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpLists {
    yes: Vec<UserId>,
    no: Vec<UserId>,
    maybe: Vec<UserId>,
}

impl RsvpLists {
    /// Creates empty lists
    #[must_use]
    pub const fn new() -> Self {
        Self {
            yes: Vec::new(),
            no: Vec::new(),
            maybe: Vec::new(),
        }
    }

    /// The list for one choice
    #[must_use]
    pub fn list(&self, choice: RsvpChoice) -> &[UserId] {
        match choice {
            RsvpChoice::Yes => &self.yes,
            RsvpChoice::No => &self.no,
            RsvpChoice::Maybe => &self.maybe,
        }
    }

    fn list_mut(&mut self, choice: RsvpChoice) -> &mut Vec<UserId> {
        match choice {
            RsvpChoice::Yes => &mut self.yes,
            RsvpChoice::No => &mut self.no,
            RsvpChoice::Maybe => &mut self.maybe,
        }
    }

    /// The first list containing `user`, if any
    #[must_use]
    pub fn response_of(&self, user: &UserId) -> Option<RsvpChoice> {
        RsvpChoice::ALL
            .into_iter()
            .find(|choice| self.list(*choice).contains(user))
    }

    /// Append `user` to the list for `choice`
    pub fn record(&mut self, user: UserId, choice: RsvpChoice) {
        self.list_mut(choice).push(user);
    }

    /// Remove `user` from whichever list holds it
    pub fn withdraw(&mut self, user: &UserId) -> Option<RsvpChoice> {
        let choice = self.response_of(user)?;
        let list = self.list_mut(choice);
        if let Some(position) = list.iter().position(|id| id == user) {
            list.remove(position);
        }
        Some(choice)
    }

    /// Total number of responses
    #[must_use]
    pub fn total(&self) -> usize {
        self.yes.len() + self.no.len() + self.maybe.len()
    }

    /// Users recorded more than once across the three lists
    #[must_use]
    pub fn violations(&self) -> Vec<UserId> {
        let mut seen = std::collections::HashSet::new();
        let mut repeated = Vec::new();
        for id in self.yes.iter().chain(&self.no).chain(&self.maybe) {
            if !seen.insert(*id) && !repeated.contains(id) {
                repeated.push(*id);
            }
        }
        repeated
    }
}

/// An event with its RSVP lists
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier
    pub id: EventId,
    /// Event name, at most 200 characters
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Where it takes place
    pub location: Option<String>,
    /// When it takes place
    pub date: DateTime<Utc>,
    /// Owning user
    pub created_by: UserId,
    /// Responses
    pub rsvp: RsvpLists,
    /// When it was created
    pub created_at: DateTime<Utc>,
    /// When it was last edited
    pub updated_at: DateTime<Utc>,
}

/// Details supplied when creating an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Location
    pub location: Option<String>,
    /// Date
    pub date: DateTime<Utc>,
}

/// Owner edits to an event
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New location
    pub location: Option<String>,
    /// New date
    pub date: Option<DateTime<Utc>>,
}

impl EventUpdate {
    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.date.is_none()
    }
}

/// Page request for listings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    pub page: usize,
    /// Items per page
    pub page_size: usize,
}

impl Page {
    /// Default number of items per page
    pub const DEFAULT_SIZE: usize = 20;
    /// Largest accepted page size
    pub const MAX_SIZE: usize = 100;

    /// Creates a page request; page 0 means page 1, size is clamped to `1..=100`
    #[must_use]
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// Number of items to skip
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_SIZE)
    }
}

/// One page of results
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paged<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// The page that was served
    pub page: Page,
    /// Total matching items across all pages
    pub total: usize,
}

impl<T> Paged<T> {
    /// Slice `all` according to `page`
    #[must_use]
    pub fn from_sorted(all: Vec<T>, page: Page) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .collect();
        Self { items, page, total }
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Direction of a vote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteDirection {
    /// Up vote
    Up,
    /// Down vote
    Down,
}

/// One user's vote on a post
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Voter
    pub user_id: UserId,
    /// Direction
    pub direction: VoteDirection,
}

/// A post with at most one vote per user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Identifier
    pub id: PostId,
    /// Author
    pub author: UserId,
    /// Body text, trimmed and non-empty
    pub content: String,
    /// Votes in the order they were cast
    pub votes: Vec<Vote>,
    /// When it was created
    pub created_at: DateTime<Utc>,
    /// When the content was last edited
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// The vote `user` has cast, if any
    #[must_use]
    pub fn vote_of(&self, user: &UserId) -> Option<VoteDirection> {
        self.votes
            .iter()
            .find(|vote| vote.user_id == *user)
            .map(|vote| vote.direction)
    }

    /// Number of up votes
    #[must_use]
    pub fn up_votes(&self) -> usize {
        self.count(VoteDirection::Up)
    }

    /// Number of down votes
    #[must_use]
    pub fn down_votes(&self) -> usize {
        self.count(VoteDirection::Down)
    }

    /// Up votes minus down votes
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // vote counts stay far below i64::MAX
    pub fn score(&self) -> i64 {
        self.up_votes() as i64 - self.down_votes() as i64
    }

    fn count(&self, direction: VoteDirection) -> usize {
        self.votes
            .iter()
            .filter(|vote| vote.direction == direction)
            .count()
    }
}
