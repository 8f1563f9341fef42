use serde::{Deserialize, Serialize};

/// Fee charged for a charity role application, in minor currency units.
pub const ROLE_FEE_MINOR_UNITS: u32 = 2500;
/// The same fee as recorded in the transaction history.
pub const ROLE_FEE_AMOUNT: f64 = 25.0;
pub const ROLE_FEE_CURRENCY: &str = "usd";
pub const ROLE_REQUEST_PURPOSE: &str = "Charity Role Request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Donations,
    CharityRequests,
    CharityRoleRequests,
    TransactionHistory,
}

impl_str_for_enum!(
    Collection,
    Users => "users",
    Donations => "addDonation",
    CharityRequests => "charityRequests",
    CharityRoleRequests => "charity_role_request",
    TransactionHistory => "transactionHistory",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "charity")]
    Charity,
    #[serde(rename = "admin")]
    Admin,
}

impl_str_for_enum!(Role, User => "user", Charity => "charity", Admin => "admin");

/// Lifecycle of a posted donation.
///
/// The pending state is stored as the literal `"panding"`. Both the writer
/// (donation creation) and the reader (public pending list) use this variant,
/// so they always agree. Documents spelled `"pending"` still decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DonationStatus {
    #[serde(rename = "panding", alias = "pending")]
    Pending,
    #[serde(rename = "accepted")]
    Accepted,
}

impl_str_for_enum!(DonationStatus, Pending => "panding" | "pending", Accepted => "accepted");

/// Status of a charity's pickup request for a donation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    #[serde(rename = "requested")]
    Requested,
    #[serde(rename = "accepted")]
    Accepted,
    #[serde(rename = "rejected")]
    Rejected,
}

impl_str_for_enum!(
    RequestStatus,
    Requested => "requested",
    Accepted => "accepted",
    Rejected => "rejected",
);

/// Status shared by charity role applications and their transaction records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
}

impl_str_for_enum!(
    ReviewStatus,
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
);
