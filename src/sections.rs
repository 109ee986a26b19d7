use serde::{Deserialize, Serialize};

/// The five resource-type contexts the console operates on. Exactly one is
/// active at a time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Accounts,
    Listings,
    LinkedListings,
    Operators,
    Complexes,
}

pub const ALL_SECTIONS: [Section; 5] = [
    Section::Accounts,
    Section::Listings,
    Section::LinkedListings,
    Section::Operators,
    Section::Complexes,
];

impl Section {
    pub fn label(self) -> &'static str {
        match self {
            Section::Accounts => "Accounts",
            Section::Listings => "Listings",
            Section::LinkedListings => "Complex listings",
            Section::Operators => "Operators",
            Section::Complexes => "Residential complexes",
        }
    }

    /// Collection endpoint on the marketplace API. Linked listings are a
    /// client-side view over the listings collection, and operators are
    /// accounts with an operator role, so both share wire endpoints.
    pub fn endpoint(self) -> &'static str {
        match self {
            Section::Accounts => "/users",
            Section::Listings | Section::LinkedListings => "/properties",
            Section::Operators => "/admins",
            Section::Complexes => "/complexes",
        }
    }

    /// Key the named-plural envelope wraps this section's rows in.
    pub fn collection_key(self) -> &'static str {
        match self {
            Section::Accounts => "users",
            Section::Listings | Section::LinkedListings => "properties",
            Section::Operators => "admins",
            Section::Complexes => "complexes",
        }
    }

    /// Form fields that must be non-empty before a create/update submission.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Section::Accounts | Section::Operators => &["name", "email"],
            Section::Listings | Section::LinkedListings => &["title", "address"],
            Section::Complexes => &["name", "address"],
        }
    }

    /// Deletes for operator rows go through the accounts endpoint; operators
    /// are not a distinct collection server-side.
    pub fn mutation_target(self) -> Section {
        match self {
            Section::Operators => Section::Accounts,
            Section::LinkedListings => Section::Listings,
            other => other,
        }
    }
}

/// Account roles the console distinguishes. Only tenant accounts carry the
/// preferences sub-resource.
pub const ROLE_TENANT: &str = "tenant";
pub const ROLE_LANDLORD: &str = "landlord";
pub const ROLE_OPERATOR: &str = "operator";
