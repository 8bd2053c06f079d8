/// State evaluator — the action/condition mini-language and text
/// interpolation.
///
/// Content strings parse into tagged variants before anything is evaluated,
/// so the fail-open contract is explicit per variant: malformed input
/// becomes a no-op directive or a safe-default condition, never an error.

use log::debug;

use crate::schema::state::GameState;

/// A parsed action directive: `command(key[, value])`.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    SetFlag { name: String, value: bool },
    SetVar { name: String, value: f64 },
    Increment { name: String, amount: f64 },
    Decrement { name: String, amount: f64 },
    /// Unrecognized or malformed input; applying it is a no-op.
    Unknown,
}

impl Directive {
    pub fn parse(raw: &str) -> Directive {
        let raw = raw.trim();
        let Some(open) = raw.find('(') else {
            debug!("ignoring malformed action '{raw}'");
            return Directive::Unknown;
        };
        if !raw.ends_with(')') {
            debug!("ignoring malformed action '{raw}'");
            return Directive::Unknown;
        }

        let command = raw[..open].trim();
        let args = &raw[open + 1..raw.len() - 1];
        let mut parts = args.splitn(2, ',');
        let name = parts.next().unwrap_or("").trim();
        let value = parts.next().map(str::trim);
        if name.is_empty() {
            debug!("ignoring action '{raw}' with no key");
            return Directive::Unknown;
        }
        let name = name.to_string();

        match command {
            // The literal "true" sets the flag; anything else clears it.
            "set_flag" => Directive::SetFlag {
                name,
                value: value == Some("true"),
            },
            "set_var" => match parse_amount(value) {
                Some(value) => Directive::SetVar { name, value },
                None => Directive::Unknown,
            },
            // A missing amount steps by one.
            "increment" => match value {
                None => Directive::Increment { name, amount: 1.0 },
                some => match parse_amount(some) {
                    Some(amount) => Directive::Increment { name, amount },
                    None => Directive::Unknown,
                },
            },
            "decrement" => match value {
                None => Directive::Decrement { name, amount: 1.0 },
                some => match parse_amount(some) {
                    Some(amount) => Directive::Decrement { name, amount },
                    None => Directive::Unknown,
                },
            },
            other => {
                debug!("ignoring unknown action command '{other}'");
                Directive::Unknown
            }
        }
    }

    /// Mutate the game state. `Unknown` does nothing.
    pub fn apply(&self, state: &mut GameState) {
        match self {
            Directive::SetFlag { name, value } => {
                state.flags.insert(name.clone(), *value);
            }
            Directive::SetVar { name, value } => {
                state.vars.insert(name.clone(), *value);
            }
            Directive::Increment { name, amount } => {
                *state.vars.entry(name.clone()).or_insert(0.0) += amount;
            }
            Directive::Decrement { name, amount } => {
                *state.vars.entry(name.clone()).or_insert(0.0) -= amount;
            }
            Directive::Unknown => {}
        }
    }
}

fn parse_amount(value: Option<&str>) -> Option<f64> {
    let raw = value?;
    match raw.parse::<f64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            debug!("ignoring action with non-numeric value '{raw}'");
            None
        }
    }
}

/// A parsed boolean condition gating choice visibility.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Absent or empty expression.
    Always,
    /// Bare flag name; true when the flag is set (missing reads false).
    FlagSet(String),
    /// `!flag`; true when the flag is unset.
    FlagClear(String),
    /// `var OP number`; a missing variable reads 0.
    Compare { var: String, op: CmpOp, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
}

impl CmpOp {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
        }
    }
}

/// Two-character operators first, so ">=" is not read as ">".
const COMPARISONS: &[(&str, CmpOp)] = &[
    (">=", CmpOp::Ge),
    ("<=", CmpOp::Le),
    ("==", CmpOp::Eq),
    (">", CmpOp::Gt),
    ("<", CmpOp::Lt),
];

impl Condition {
    /// No boolean composition is supported — a condition is a single flag
    /// test or a single numeric comparison. Anything that parses as neither
    /// falls back to flag truthiness over the whole expression, which reads
    /// false for a flag nobody ever set.
    pub fn parse(expr: Option<&str>) -> Condition {
        let Some(expr) = expr else {
            return Condition::Always;
        };
        let expr = expr.trim();
        if expr.is_empty() {
            return Condition::Always;
        }

        if let Some(flag) = expr.strip_prefix('!') {
            return Condition::FlagClear(flag.trim().to_string());
        }

        for (token, op) in COMPARISONS {
            if let Some((name, number)) = expr.split_once(token) {
                let name = name.trim();
                if let (false, Ok(value)) = (name.is_empty(), number.trim().parse::<f64>()) {
                    return Condition::Compare {
                        var: name.to_string(),
                        op: *op,
                        value,
                    };
                }
                debug!("treating malformed comparison '{expr}' as a flag name");
                break;
            }
        }

        Condition::FlagSet(expr.to_string())
    }

    pub fn evaluate(&self, state: &GameState) -> bool {
        match self {
            Condition::Always => true,
            Condition::FlagSet(name) => state.flag(name),
            Condition::FlagClear(name) => !state.flag(name),
            Condition::Compare { var, op, value } => op.holds(state.var(var), *value),
        }
    }
}

/// Parse and apply one raw action directive against the game state.
pub fn apply_action(state: &mut GameState, raw: &str) {
    Directive::parse(raw).apply(state);
}

/// Parse and evaluate one raw condition expression.
pub fn evaluate_condition(state: &GameState, expr: Option<&str>) -> bool {
    Condition::parse(expr).evaluate(state)
}

/// Replace every `{name}` occurrence with the display form of the variable
/// or flag of that name. Unknown names and malformed braces pass through as
/// literal text.
pub fn interpolate(state: &GameState, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match state.display(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                // Unclosed brace: keep the remainder verbatim.
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_var(name: &str, value: f64) -> GameState {
        let mut state = GameState::default();
        state.vars.insert(name.to_string(), value);
        state
    }

    #[test]
    fn parse_set_flag_true() {
        assert_eq!(
            Directive::parse("set_flag(met_alex, true)"),
            Directive::SetFlag {
                name: "met_alex".to_string(),
                value: true
            }
        );
    }

    #[test]
    fn parse_set_flag_anything_else_is_false() {
        assert_eq!(
            Directive::parse("set_flag(met_alex, yes)"),
            Directive::SetFlag {
                name: "met_alex".to_string(),
                value: false
            }
        );
        assert_eq!(
            Directive::parse("set_flag(met_alex)"),
            Directive::SetFlag {
                name: "met_alex".to_string(),
                value: false
            }
        );
    }

    #[test]
    fn parse_set_var() {
        assert_eq!(
            Directive::parse("set_var(study_level, 2.5)"),
            Directive::SetVar {
                name: "study_level".to_string(),
                value: 2.5
            }
        );
    }

    #[test]
    fn parse_increment_default_step() {
        assert_eq!(
            Directive::parse("increment(friendship_score)"),
            Directive::Increment {
                name: "friendship_score".to_string(),
                amount: 1.0
            }
        );
    }

    #[test]
    fn parse_decrement_explicit_step() {
        assert_eq!(
            Directive::parse("decrement(energy, 3)"),
            Directive::Decrement {
                name: "energy".to_string(),
                amount: 3.0
            }
        );
    }

    #[test]
    fn malformed_directives_are_unknown() {
        assert_eq!(Directive::parse("set_flag"), Directive::Unknown);
        assert_eq!(Directive::parse("set_flag(met_alex"), Directive::Unknown);
        assert_eq!(Directive::parse("set_var(x, lots)"), Directive::Unknown);
        assert_eq!(Directive::parse("increment(, 1)"), Directive::Unknown);
        assert_eq!(Directive::parse("explode(everything)"), Directive::Unknown);
    }

    #[test]
    fn apply_increment_treats_missing_as_zero() {
        let mut state = GameState::default();
        apply_action(&mut state, "increment(friendship_score, 2)");
        assert_eq!(state.var("friendship_score"), 2.0);
        apply_action(&mut state, "decrement(energy)");
        assert_eq!(state.var("energy"), -1.0);
    }

    #[test]
    fn apply_unknown_is_noop() {
        let mut state = GameState::default();
        apply_action(&mut state, "not even a directive");
        assert_eq!(state, GameState::default());
    }

    #[test]
    fn condition_absent_or_empty_is_true() {
        let state = GameState::default();
        assert!(evaluate_condition(&state, None));
        assert!(evaluate_condition(&state, Some("")));
        assert!(evaluate_condition(&state, Some("   ")));
    }

    #[test]
    fn condition_numeric_comparison() {
        let state = state_with_var("friendship_score", 5.0);
        assert!(evaluate_condition(&state, Some("friendship_score>=5")));
        assert!(!evaluate_condition(
            &state_with_var("friendship_score", 4.0),
            Some("friendship_score>=5")
        ));
        assert!(evaluate_condition(&state, Some("friendship_score==5")));
        assert!(evaluate_condition(&state, Some("friendship_score<=5")));
        assert!(!evaluate_condition(&state, Some("friendship_score>5")));
        assert!(!evaluate_condition(&state, Some("friendship_score<5")));
    }

    #[test]
    fn condition_missing_var_reads_zero() {
        let state = GameState::default();
        assert!(evaluate_condition(&state, Some("study_level<1")));
        assert!(!evaluate_condition(&state, Some("study_level>=1")));
    }

    #[test]
    fn condition_negated_missing_flag_is_true() {
        let state = GameState::default();
        assert!(evaluate_condition(&state, Some("!has_key")));
    }

    #[test]
    fn condition_bare_flag_truthiness() {
        let mut state = GameState::default();
        assert!(!evaluate_condition(&state, Some("met_alex")));
        state.flags.insert("met_alex".to_string(), true);
        assert!(evaluate_condition(&state, Some("met_alex")));
        assert!(!evaluate_condition(&state, Some("!met_alex")));
    }

    #[test]
    fn condition_malformed_comparison_falls_back_to_flag() {
        let state = GameState::default();
        // "score>=lots" is not a comparison; as a flag name it was never set.
        assert!(!evaluate_condition(&state, Some("score>=lots")));
    }

    #[test]
    fn interpolate_replaces_vars_and_flags() {
        let mut state = state_with_var("friendship_score", 5.0);
        state.flags.insert("met_alex".to_string(), true);
        assert_eq!(
            interpolate(&state, "Score {friendship_score}, met: {met_alex}."),
            "Score 5, met: true."
        );
    }

    #[test]
    fn interpolate_unknown_left_verbatim() {
        let state = GameState::default();
        assert_eq!(
            interpolate(&state, "Hello {stranger}!"),
            "Hello {stranger}!"
        );
    }

    #[test]
    fn interpolate_unclosed_brace_left_verbatim() {
        let state = state_with_var("score", 1.0);
        assert_eq!(interpolate(&state, "broken {score"), "broken {score");
    }

    #[test]
    fn interpolate_fractional_display() {
        let state = state_with_var("gpa", 3.5);
        assert_eq!(interpolate(&state, "GPA: {gpa}"), "GPA: 3.5");
    }

    #[test]
    fn interpolate_plain_text_untouched() {
        let state = GameState::default();
        assert_eq!(interpolate(&state, "No placeholders here."), "No placeholders here.");
    }
}
