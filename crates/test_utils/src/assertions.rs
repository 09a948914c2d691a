//! Custom Test Assertions
//!
//! Assertion helpers that print the whole declaration or error on failure.

use domain_declarations::{
    Declaration, DeclarationError, DeclarationState, FieldErrorCode, LineItem, LineItemIntent,
    RuleViolation,
};

/// Asserts the declaration's current state
pub fn assert_state(declaration: &Declaration, expected: DeclarationState) {
    assert_eq!(
        declaration.state, expected,
        "Expected declaration {} to be {}, got {}",
        declaration.id, expected, declaration.state
    );
}

/// Asserts the full state history, oldest first
pub fn assert_history(declaration: &Declaration, expected: &[DeclarationState]) {
    let actual: Vec<DeclarationState> = declaration.history.iter().map(|r| r.state).collect();
    assert_eq!(
        actual, expected,
        "State history mismatch for declaration {}",
        declaration.id
    );
}

/// Asserts a validation failure that includes `field` with `code`
pub fn assert_field_error(error: &DeclarationError, field: &str, code: FieldErrorCode) {
    let found = error
        .field_errors()
        .iter()
        .any(|e| e.field == field && e.code == code);
    assert!(
        found,
        "Expected field error {:?} on '{}', got {:?}",
        code, field, error
    );
}

/// Asserts a business-rule failure of the given kind
pub fn assert_rule_violation(error: &DeclarationError, expected: RuleViolation) {
    assert_eq!(
        error.violation(),
        Some(expected),
        "Expected business rule {:?}, got {:?}",
        expected,
        error
    );
}

/// Asserts how many active items with `intent` are in `items`
pub fn assert_active_items(items: &[LineItem], intent: LineItemIntent, expected: usize) {
    let actual = items.iter().filter(|i| i.active && i.intent == intent).count();
    assert_eq!(
        actual, expected,
        "Expected {} active {} line items, got {} in {:?}",
        expected, intent, actual, items
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{DeclarationId, StatementId};

    #[test]
    fn test_active_item_count_ignores_inactive() {
        let declaration = DeclarationId::new();
        let statement = StatementId::new();
        let mut inactive = LineItem::billable(declaration, statement, Utc::now());
        inactive.active = false;
        let items = vec![
            inactive,
            LineItem::billable(declaration, statement, Utc::now()),
            LineItem::refundable(declaration, statement, Utc::now()),
        ];

        assert_active_items(&items, LineItemIntent::Billable, 1);
        assert_active_items(&items, LineItemIntent::Refundable, 1);
    }

    #[test]
    #[should_panic(expected = "Expected business rule")]
    fn test_rule_assertion_rejects_other_errors() {
        let error = DeclarationError::integrity("no open statement");
        assert_rule_violation(&error, RuleViolation::NotPaid);
    }
}
