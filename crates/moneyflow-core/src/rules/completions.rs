/// What a completion inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// Method on the `tx` transaction object
    Method,
    /// Global helper function
    Function,
    /// Language keyword
    Keyword,
}

/// One autocomplete entry for the rule script editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub label: &'static str,
    pub kind: CompletionKind,
    pub detail: &'static str,
}

const fn method(label: &'static str, detail: &'static str) -> Completion {
    Completion {
        label,
        kind: CompletionKind::Method,
        detail,
    }
}

const fn function(label: &'static str, detail: &'static str) -> Completion {
    Completion {
        label,
        kind: CompletionKind::Function,
        detail,
    }
}

const fn keyword(label: &'static str) -> Completion {
    Completion {
        label,
        kind: CompletionKind::Keyword,
        detail: "keyword",
    }
}

/// Catalogue of everything a rule script can reference.
pub static CATALOGUE: &[Completion] = &[
    method("tx:title", "tx:title() / tx:title(value) - transaction title"),
    method("tx:notes", "tx:notes() / tx:notes(value) - free-form notes"),
    method("tx:transactionType", "tx:transactionType() - numeric transaction type"),
    method("tx:sourceAccountID", "tx:sourceAccountID() / tx:sourceAccountID(id)"),
    method("tx:sourceAmount", "tx:sourceAmount() / tx:sourceAmount(decimal)"),
    method("tx:sourceCurrency", "tx:sourceCurrency() / tx:sourceCurrency(code)"),
    method("tx:destinationAccountID", "tx:destinationAccountID() / tx:destinationAccountID(id)"),
    method("tx:destinationAmount", "tx:destinationAmount() / tx:destinationAmount(decimal)"),
    method("tx:destinationCurrency", "tx:destinationCurrency() / tx:destinationCurrency(code)"),
    method("tx:categoryID", "tx:categoryID() / tx:categoryID(id)"),
    method("tx:getTags", "tx:getTags() - list of tag ids"),
    method("tx:addTag", "tx:addTag(id)"),
    method("tx:removeTag", "tx:removeTag(id)"),
    method("tx:removeAllTags", "tx:removeAllTags()"),
    method("tx:referenceNumber", "tx:referenceNumber() / tx:referenceNumber(value)"),
    method("tx:transactionDate", "tx:transactionDate() - RFC 3339 timestamp"),
    function("helpers.getAccountByID", "helpers.getAccountByID(id) - account table or nil"),
    function("helpers.convertCurrency", "helpers.convertCurrency(from, to, amount)"),
    function("helpers.getCategoryByName", "helpers.getCategoryByName(name) - category table or nil"),
    function("helpers.getTagByName", "helpers.getTagByName(name) - tag table or nil"),
    keyword("if"),
    keyword("then"),
    keyword("else"),
    keyword("elseif"),
    keyword("end"),
    keyword("local"),
    keyword("return"),
    keyword("and"),
    keyword("or"),
    keyword("not"),
    keyword("nil"),
    keyword("true"),
    keyword("false"),
];

/// Entries whose label starts with `prefix` (case-insensitive), methods first.
pub fn completions(prefix: &str) -> Vec<&'static Completion> {
    let prefix = prefix.to_ascii_lowercase();
    let mut matches: Vec<&'static Completion> = CATALOGUE
        .iter()
        .filter(|c| c.label.to_ascii_lowercase().starts_with(&prefix))
        .collect();
    matches.sort_by_key(|c| match c.kind {
        CompletionKind::Method => 0,
        CompletionKind::Function => 1,
        CompletionKind::Keyword => 2,
    });
    matches
}
