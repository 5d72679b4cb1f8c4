//! Checks applied to literal bodies

use graphql_parser::query::{Definition, Directive, OperationDefinition, Selection, SelectionSet};
use once_cell::sync::Lazy;
use regex::Regex;

const FRAGMENT_VARIABLE_DIRECTIVES: [&str; 2] = ["arguments", "argumentDefinitions"];

static FRAGMENT_VARIABLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@argument(Definition)?s\b").unwrap());

/// Lexical guard: does the raw text mention `@arguments` or `@argumentDefinitions`?
pub fn mentions_fragment_variables(body: &str) -> bool {
    FRAGMENT_VARIABLES.is_match(body)
}

/// True when the body has nothing but whitespace, commas and comments
pub fn is_blank_document(body: &str) -> bool {
    body.lines().all(|line| {
        let code = line.split('#').next().unwrap_or("");
        code.chars().all(|c| c.is_whitespace() || c == ',')
    })
}

/// Structural guard: does the definition apply a fragment variable directive anywhere?
pub fn uses_fragment_variables(definition: &Definition<'_, String>) -> bool {
    match definition {
        Definition::Fragment(fragment) => {
            any_fragment_variable(&fragment.directives)
                || selection_set_uses(&fragment.selection_set)
        }
        Definition::Operation(OperationDefinition::SelectionSet(set)) => selection_set_uses(set),
        Definition::Operation(OperationDefinition::Query(query)) => {
            any_fragment_variable(&query.directives) || selection_set_uses(&query.selection_set)
        }
        Definition::Operation(OperationDefinition::Mutation(mutation)) => {
            any_fragment_variable(&mutation.directives)
                || selection_set_uses(&mutation.selection_set)
        }
        Definition::Operation(OperationDefinition::Subscription(subscription)) => {
            any_fragment_variable(&subscription.directives)
                || selection_set_uses(&subscription.selection_set)
        }
    }
}

fn selection_set_uses(set: &SelectionSet<'_, String>) -> bool {
    set.items.iter().any(|selection| match selection {
        Selection::Field(field) => {
            any_fragment_variable(&field.directives) || selection_set_uses(&field.selection_set)
        }
        Selection::FragmentSpread(spread) => any_fragment_variable(&spread.directives),
        Selection::InlineFragment(inline) => {
            any_fragment_variable(&inline.directives) || selection_set_uses(&inline.selection_set)
        }
    })
}

fn any_fragment_variable(directives: &[Directive<'_, String>]) -> bool {
    directives
        .iter()
        .any(|directive| FRAGMENT_VARIABLE_DIRECTIVES.contains(&directive.name.as_str()))
}
