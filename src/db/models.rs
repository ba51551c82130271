/// A stored credential, mirroring what a browser keeps in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub expires_at: String,
}

/// A cached vote row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVote {
    pub subject_kind: String,
    pub subject_id: String,
    pub value: i64,
    pub confirmed: bool,
}
