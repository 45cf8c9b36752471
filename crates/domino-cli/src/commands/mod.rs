pub mod order;
pub mod solve;
pub mod tree;

use crate::error::Result;
use domino_engine::core::io::problem_file::LoadedProblem;
use domino_engine::core::models::assignment::Assignment;
use domino_engine::core::models::subset::Subset;
use domino_engine::core::models::variable::VariableTable;

/// The queried variables: the named ones, or every variable when none are named.
pub(crate) fn query_variables(loaded: &LoadedProblem, names: &[String]) -> Result<Subset> {
    if names.is_empty() {
        return Ok(loaded.variables.all());
    }
    Ok(Subset::new(loaded.resolve(names)?))
}

pub(crate) fn subset_names(variables: &VariableTable, subset: &Subset) -> String {
    subset
        .iter()
        .map(|v| variables.name(v).unwrap_or("?"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn format_assignment(
    variables: &VariableTable,
    subset: &Subset,
    assignment: &Assignment,
) -> String {
    subset
        .iter()
        .zip(assignment.iter())
        .map(|(v, state)| format!("{}={}", variables.name(v).unwrap_or("?"), state))
        .collect::<Vec<_>>()
        .join(" ")
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use domino_engine::core::io::problem_file::load_problem;

    #[test]
    fn query_defaults_to_every_variable() {
        let file = problem_file(THREE_VARIABLES);
        let loaded = load_problem(file.path()).unwrap();
        assert_eq!(query_variables(&loaded, &[]).unwrap().len(), 3);
        let named = query_variables(&loaded, &["z".to_string(), "x".to_string()]).unwrap();
        assert_eq!(subset_names(&loaded.variables, &named), "x, z");
    }

    #[test]
    fn unknown_query_variables_are_rejected() {
        let file = problem_file(THREE_VARIABLES);
        let loaded = load_problem(file.path()).unwrap();
        assert!(query_variables(&loaded, &["w".to_string()]).is_err());
    }

    #[test]
    fn assignments_are_printed_by_name() {
        let file = problem_file(THREE_VARIABLES);
        let loaded = load_problem(file.path()).unwrap();
        let all = loaded.variables.all();
        let text = format_assignment(&loaded.variables, &all, &Assignment::new(vec![1, 0, 1]));
        assert_eq!(text, "x=1 y=0 z=1");
    }
}
