use crate::address::compare_addresses;
use crate::config::Config;
use crate::directory_client::DirectoryClient;
use crate::models::{CustomerAddress, CustomerRecord, MatchDecision, ParsedAddress};
use crate::phone::normalize_phone;
use crate::similarity::sequence_ratio;
use std::collections::HashSet;

/// Identity signals extracted from one submission. Phone is expected in
/// normalized form.
#[derive(Debug, Clone, Default)]
pub struct MatchQuery<'a> {
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub address: Option<&'a ParsedAddress>,
    pub is_existing_customer: bool,
}

/// Resolves a submission against the directory by phone, email, name, and
/// address.
///
/// Matching logic:
/// 1. Search by phone and email (concurrently; a failed search counts as
///    zero hits).
/// 2. Exact: both searches returned the same record.
/// 3. Partial: one signal matched; whether the record is adopted depends on
///    the submitter's own claim of being an existing customer.
/// 4. None: create a new customer.
pub struct CustomerMatchEngine {
    directory: DirectoryClient,
    default_area_code: String,
}

impl CustomerMatchEngine {
    pub fn new(directory: DirectoryClient, config: &Config) -> Self {
        Self {
            directory,
            default_area_code: config.default_area_code.clone(),
        }
    }

    pub async fn resolve(&self, query: &MatchQuery<'_>) -> MatchDecision {
        tracing::info!(
            "Searching for customer: phone={:?}, email={:?}, name={:?}",
            query.phone,
            query.email,
            query.name
        );

        let (phone_matches, email_matches) = tokio::join!(
            self.search_by_token(query.phone),
            self.search_by_token(query.email),
        );
        tracing::info!(
            "Found {} customers by phone, {} by email",
            phone_matches.len(),
            email_matches.len()
        );

        // Records present in both result sets are exact matches.
        let exact_matches = Self::intersect_by_id(&phone_matches, &email_matches);
        if !exact_matches.is_empty() {
            tracing::info!("Found {} exact matches", exact_matches.len());
            let best = self.select_best(&exact_matches, query.name, query.address);
            return MatchDecision::Exact {
                customer: best.clone(),
            };
        }

        // Otherwise consider the union, phone results first.
        let all_matches = Self::dedup_by_id(phone_matches, email_matches);
        if !all_matches.is_empty() {
            tracing::info!("Found {} partial matches", all_matches.len());
            let best = self.select_best(&all_matches, query.name, query.address).clone();
            let confidence = self.confidence(&best, query.phone, query.email, query.name);

            let mut matched_fields = Vec::new();
            if query
                .phone
                .is_some_and(|p| self.customer_has_phone(&best, p))
            {
                matched_fields.push("phone");
            }
            if query.email.is_some_and(|e| Self::customer_has_email(&best, e)) {
                matched_fields.push("email");
            }

            let mut warnings = vec![format!(
                "Partial match: {} matched, but not all fields. Please verify this is the correct customer.",
                matched_fields.join(" and ")
            )];

            if query.is_existing_customer {
                tracing::info!("Using matched customer (user indicated existing)");
                return MatchDecision::Partial {
                    confidence,
                    candidate: best,
                    adopt_existing: true,
                    warnings,
                };
            }

            tracing::warn!("User says new customer, but found potential match");
            warnings.push(
                "User indicated NEW customer, but potential duplicate found. \
                 Creating new customer record. Please review and merge if duplicate."
                    .to_string(),
            );
            return MatchDecision::Partial {
                confidence,
                candidate: best,
                adopt_existing: false,
                warnings,
            };
        }

        tracing::info!("No matching customers found");
        MatchDecision::NoMatch
    }

    /// A failed or empty lookup degrades to zero matches; it never blocks the
    /// request.
    async fn search_by_token(&self, token: Option<&str>) -> Vec<CustomerRecord> {
        let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
            return Vec::new();
        };
        match self.directory.search_customers(token).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Customer search failed, treating as no matches: {}", e);
                Vec::new()
            }
        }
    }

    fn intersect_by_id(
        phone_matches: &[CustomerRecord],
        email_matches: &[CustomerRecord],
    ) -> Vec<CustomerRecord> {
        if phone_matches.is_empty() || email_matches.is_empty() {
            return Vec::new();
        }
        let phone_ids: HashSet<&str> = phone_matches.iter().map(|c| c.id.as_str()).collect();
        email_matches
            .iter()
            .filter(|c| phone_ids.contains(c.id.as_str()))
            .cloned()
            .collect()
    }

    fn dedup_by_id(
        phone_matches: Vec<CustomerRecord>,
        email_matches: Vec<CustomerRecord>,
    ) -> Vec<CustomerRecord> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for customer in phone_matches.into_iter().chain(email_matches) {
            if !customer.id.is_empty() && seen.insert(customer.id.clone()) {
                unique.push(customer);
            }
        }
        unique
    }

    /// Best candidate by name and address similarity; ties keep list order.
    fn select_best<'c>(
        &self,
        candidates: &'c [CustomerRecord],
        name: Option<&str>,
        address: Option<&ParsedAddress>,
    ) -> &'c CustomerRecord {
        if candidates.len() == 1 {
            return &candidates[0];
        }

        let mut best = &candidates[0];
        let mut best_score = self.score_candidate(best, name, address);
        for candidate in &candidates[1..] {
            let score = self.score_candidate(candidate, name, address);
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }
        best
    }

    /// `0.5·name ratio + 0.5·(best address similarity)`, each term only when
    /// the corresponding input is available. The address term adds the best
    /// similarity across the candidate's known addresses once.
    fn score_candidate(
        &self,
        candidate: &CustomerRecord,
        name: Option<&str>,
        address: Option<&ParsedAddress>,
    ) -> f64 {
        let mut score = 0.0;

        if let Some(name) = name {
            let candidate_name = candidate.full_name();
            if !candidate_name.is_empty() {
                score += sequence_ratio(&name.to_lowercase(), &candidate_name.to_lowercase()) * 0.5;
            }
        }

        if let Some(address) = address {
            if !candidate.addresses.is_empty() {
                let best_similarity = candidate
                    .addresses
                    .iter()
                    .map(|a| compare_addresses(address, &a.to_parsed()))
                    .fold(0.0, f64::max);
                score += best_similarity * 0.5;
            }
        }

        score
    }

    /// Confidence of a partial match: phone 40%, email 40%, name ratio 20%.
    /// Each term is included only when the corresponding input was supplied;
    /// no renormalization, so absent signals cap the score below 1.0.
    fn confidence(
        &self,
        customer: &CustomerRecord,
        phone: Option<&str>,
        email: Option<&str>,
        name: Option<&str>,
    ) -> f64 {
        let mut score = 0.0;

        if let Some(phone) = phone {
            if self.customer_has_phone(customer, phone) {
                score += 0.4;
            }
        }

        if let Some(email) = email {
            if Self::customer_has_email(customer, email) {
                score += 0.4;
            }
        }

        if let Some(name) = name {
            let customer_name = customer.full_name();
            if !customer_name.is_empty() {
                score += sequence_ratio(&name.to_lowercase(), &customer_name.to_lowercase()) * 0.2;
            }
        }

        score
    }

    fn customer_has_phone(&self, customer: &CustomerRecord, phone: &str) -> bool {
        customer
            .stored_phone()
            .and_then(|stored| normalize_phone(stored, &self.default_area_code))
            .is_some_and(|stored| stored == phone)
    }

    fn customer_has_email(customer: &CustomerRecord, email: &str) -> bool {
        customer
            .email
            .as_deref()
            .map(|stored| stored.trim().to_lowercase())
            .filter(|stored| !stored.is_empty())
            .is_some_and(|stored| stored == email.trim().to_lowercase())
    }
}

// ============ Address reconciliation ============

/// Whether a proposed address is new enough to create in the directory.
///
/// Empty proposals never create; a customer with no addresses always does;
/// otherwise a new address is created unless some known address is strictly
/// more similar than the threshold.
pub fn needs_new_address(
    known: &[CustomerAddress],
    proposed: &ParsedAddress,
    threshold: f64,
) -> bool {
    if proposed.is_empty() {
        return false;
    }
    if known.is_empty() {
        return true;
    }

    for existing in known {
        let similarity = compare_addresses(proposed, &existing.to_parsed());
        if similarity > threshold {
            tracing::info!(
                "Address is {:.0}% similar to existing, not creating new",
                similarity * 100.0
            );
            return false;
        }
    }

    tracing::info!("Address is different from existing addresses, will create new");
    true
}

/// First known address (in directory order) at least as similar as the
/// threshold; its id is the one a lead should reference.
pub fn find_matching_address<'a>(
    known: &'a [CustomerAddress],
    proposed: &ParsedAddress,
    threshold: f64,
) -> Option<&'a CustomerAddress> {
    known.iter().find(|existing| {
        let similarity = compare_addresses(&existing.to_parsed(), proposed);
        tracing::debug!(
            "Address similarity: {:.2} for address {}",
            similarity,
            existing.id
        );
        similarity >= threshold
    })
}
