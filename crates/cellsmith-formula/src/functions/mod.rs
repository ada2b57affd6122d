//! Built-in functions

pub mod array;
pub mod criteria;
pub mod database;
pub mod engineering;
pub mod info;
pub mod logical;
pub mod math;
pub mod statistical;
pub mod text;

use std::fmt;

use ahash::AHashMap;
use once_cell::sync::Lazy;

use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::value::FormulaValue;

/// Function implementation signature
///
/// Arguments arrive evaluated. Functions may consult the context, for
/// instance to invoke lambda arguments or read engine options.
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// How a function treats array arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayPolicy {
    /// An array argument is `#VALUE!`
    Scalar,
    /// Called once per element; the result takes the arguments' shape
    Elementwise,
    /// Receives arrays unchanged and reduces or reshapes them itself
    Aggregate,
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    pub policy: ArrayPolicy,
    /// Receives error arguments instead of short-circuiting on the first one
    pub accepts_errors: bool,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// A scalar-only function
    pub fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            policy: ArrayPolicy::Scalar,
            accepts_errors: false,
            implementation,
        }
    }

    pub fn elementwise(mut self) -> Self {
        self.policy = ArrayPolicy::Elementwise;
        self
    }

    pub fn aggregate(mut self) -> Self {
        self.policy = ArrayPolicy::Aggregate;
        self
    }

    pub fn accepting_errors(mut self) -> Self {
        self.accepts_errors = true;
        self
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("policy", &self.policy)
            .field("accepts_errors", &self.accepts_errors)
            .finish_non_exhaustive()
    }
}

static SHARED: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Function registry
///
/// Built-ins are registered up front; [`FunctionRegistry::register`] adds or
/// replaces entries. Lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_info_functions();
        registry.register_statistical_functions();
        registry.register_database_functions();
        registry.register_engineering_functions();
        registry.register_array_functions();

        registry
    }

    /// Process-wide registry of built-ins, used when a context is not given
    /// one explicitly
    pub fn shared() -> &'static FunctionRegistry {
        &SHARED
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions
            .get(name)
            .or_else(|| self.functions.get(&name.to_ascii_uppercase()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, replacing any built-in of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_ascii_uppercase(), def);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef::new("SUM", 1, None, math::fn_sum).aggregate());
        self.register(FunctionDef::new("AVERAGE", 1, None, math::fn_average).aggregate());
        self.register(FunctionDef::new("MIN", 1, None, math::fn_min).aggregate());
        self.register(FunctionDef::new("MAX", 1, None, math::fn_max).aggregate());
        self.register(FunctionDef::new("COUNT", 1, None, math::fn_count).aggregate());
        self.register(FunctionDef::new("PRODUCT", 1, None, math::fn_product).aggregate());

        self.register(FunctionDef::new("ABS", 1, Some(1), math::fn_abs).elementwise());
        self.register(FunctionDef::new("ROUND", 2, Some(2), math::fn_round).elementwise());
        self.register(FunctionDef::new("INT", 1, Some(1), math::fn_int).elementwise());
        self.register(FunctionDef::new("MOD", 2, Some(2), math::fn_mod).elementwise());
        self.register(FunctionDef::new("SQRT", 1, Some(1), math::fn_sqrt).elementwise());
        self.register(FunctionDef::new("POWER", 2, Some(2), math::fn_power).elementwise());
        self.register(FunctionDef::new("SIGN", 1, Some(1), math::fn_sign).elementwise());
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef::new("AND", 1, None, logical::fn_and).aggregate());
        self.register(FunctionDef::new("OR", 1, None, logical::fn_or).aggregate());
        self.register(FunctionDef::new("XOR", 1, None, logical::fn_xor).aggregate());
        self.register(FunctionDef::new("NOT", 1, Some(1), logical::fn_not).elementwise());
        self.register(FunctionDef::new("TRUE", 0, Some(0), logical::fn_true));
        self.register(FunctionDef::new("FALSE", 0, Some(0), logical::fn_false));
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef::new("LEN", 1, Some(1), text::fn_len).elementwise());
        self.register(FunctionDef::new("UPPER", 1, Some(1), text::fn_upper).elementwise());
        self.register(FunctionDef::new("LOWER", 1, Some(1), text::fn_lower).elementwise());
        self.register(FunctionDef::new("LEFT", 1, Some(2), text::fn_left).elementwise());
        self.register(FunctionDef::new("RIGHT", 1, Some(2), text::fn_right).elementwise());
        self.register(FunctionDef::new("CONCAT", 1, None, text::fn_concat).aggregate());
    }

    fn register_info_functions(&mut self) {
        let predicates: [(&'static str, FunctionImpl); 6] = [
            ("ISERROR", info::fn_iserror),
            ("ISNA", info::fn_isna),
            ("ISNUMBER", info::fn_isnumber),
            ("ISTEXT", info::fn_istext),
            ("ISBLANK", info::fn_isblank),
            ("ISLOGICAL", info::fn_islogical),
        ];
        for (name, implementation) in predicates {
            self.register(
                FunctionDef::new(name, 1, Some(1), implementation)
                    .elementwise()
                    .accepting_errors(),
            );
        }

        self.register(FunctionDef::new("NA", 0, Some(0), info::fn_na));
    }

    fn register_statistical_functions(&mut self) {
        self.register(
            FunctionDef::new("COUNTA", 1, None, statistical::fn_counta)
                .aggregate()
                .accepting_errors(),
        );
        self.register(FunctionDef::new("COUNTIF", 2, Some(2), statistical::fn_countif).aggregate());
        self.register(FunctionDef::new("SUMIF", 2, Some(3), statistical::fn_sumif).aggregate());
        self.register(
            FunctionDef::new("AVERAGEIF", 2, Some(3), statistical::fn_averageif).aggregate(),
        );
    }

    fn register_database_functions(&mut self) {
        let functions: [(&'static str, FunctionImpl); 12] = [
            ("DSUM", database::fn_dsum),
            ("DAVERAGE", database::fn_daverage),
            ("DCOUNT", database::fn_dcount),
            ("DCOUNTA", database::fn_dcounta),
            ("DMAX", database::fn_dmax),
            ("DMIN", database::fn_dmin),
            ("DGET", database::fn_dget),
            ("DPRODUCT", database::fn_dproduct),
            ("DSTDEV", database::fn_dstdev),
            ("DSTDEVP", database::fn_dstdevp),
            ("DVAR", database::fn_dvar),
            ("DVARP", database::fn_dvarp),
        ];
        for (name, implementation) in functions {
            self.register(FunctionDef::new(name, 3, Some(3), implementation).aggregate());
        }
    }

    fn register_engineering_functions(&mut self) {
        // Conversions to decimal take no `places`
        self.register(FunctionDef::new("BIN2DEC", 1, Some(1), engineering::fn_bin2dec).elementwise());
        self.register(FunctionDef::new("OCT2DEC", 1, Some(1), engineering::fn_oct2dec).elementwise());
        self.register(FunctionDef::new("HEX2DEC", 1, Some(1), engineering::fn_hex2dec).elementwise());

        let padded: [(&'static str, FunctionImpl); 9] = [
            ("BIN2OCT", engineering::fn_bin2oct),
            ("BIN2HEX", engineering::fn_bin2hex),
            ("OCT2BIN", engineering::fn_oct2bin),
            ("OCT2HEX", engineering::fn_oct2hex),
            ("HEX2BIN", engineering::fn_hex2bin),
            ("HEX2OCT", engineering::fn_hex2oct),
            ("DEC2BIN", engineering::fn_dec2bin),
            ("DEC2OCT", engineering::fn_dec2oct),
            ("DEC2HEX", engineering::fn_dec2hex),
        ];
        for (name, implementation) in padded {
            self.register(FunctionDef::new(name, 1, Some(2), implementation).elementwise());
        }

        let bitwise: [(&'static str, FunctionImpl); 5] = [
            ("BITAND", engineering::fn_bitand),
            ("BITOR", engineering::fn_bitor),
            ("BITXOR", engineering::fn_bitxor),
            ("BITLSHIFT", engineering::fn_bitlshift),
            ("BITRSHIFT", engineering::fn_bitrshift),
        ];
        for (name, implementation) in bitwise {
            self.register(FunctionDef::new(name, 2, Some(2), implementation).elementwise());
        }
    }

    fn register_array_functions(&mut self) {
        self.register(FunctionDef::new("MAKEARRAY", 3, Some(3), array::fn_makearray));
        self.register(FunctionDef::new("MAP", 2, None, array::fn_map).aggregate());
        self.register(FunctionDef::new("REDUCE", 3, Some(3), array::fn_reduce).aggregate());
        self.register(FunctionDef::new("SCAN", 3, Some(3), array::fn_scan).aggregate());
        self.register(FunctionDef::new("BYROW", 2, Some(2), array::fn_byrow).aggregate());
        self.register(FunctionDef::new("BYCOL", 2, Some(2), array::fn_bycol).aggregate());
        self.register(FunctionDef::new("SEQUENCE", 1, Some(4), array::fn_sequence));
        self.register(FunctionDef::new("TRANSPOSE", 1, Some(1), array::fn_transpose).aggregate());
        self.register(FunctionDef::new("ROWS", 1, Some(1), array::fn_rows).aggregate());
        self.register(FunctionDef::new("COLUMNS", 1, Some(1), array::fn_columns).aggregate());
        self.register(FunctionDef::new("INDEX", 2, Some(3), array::fn_index).aggregate());
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Numbers reachable from aggregate arguments
///
/// Direct numeric arguments (including booleans and numeric text) count;
/// inside arrays only true numbers do, so text, booleans, blanks and errors
/// held in ranges are skipped.
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Array1D(_) | FormulaValue::Array2D(_) => {
                numbers.extend(arg.values().filter_map(|v| match v {
                    FormulaValue::Number(n) => Some(*n),
                    _ => None,
                }));
            }
            FormulaValue::Empty => {}
            other => numbers.push(other.to_number()?),
        }
    }
    Ok(numbers)
}

/// Argument `index` as a number, with a default when omitted
pub(crate) fn number_arg(args: &[FormulaValue], index: usize, default: f64) -> FormulaResult<f64> {
    match args.get(index) {
        None | Some(FormulaValue::Empty) => Ok(default),
        Some(value) => value.to_number(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsmith_core::{CellAddress, ErrorKind};

    use crate::context::EmptySource;
    use crate::evaluator::evaluate_value;
    use crate::parser::parse_formula;

    fn fn_twice(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
        Ok(FormulaValue::Number(args[0].to_number()? * 2.0))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.get("sum").is_some());
        assert!(registry.get("Dsum").is_some());
        assert!(registry.contains("BIN2DEC"));
        assert!(!registry.contains("VLOOKUP"));
        assert_eq!(registry.get("MAKEARRAY").unwrap().policy, ArrayPolicy::Scalar);
        assert_eq!(registry.get("ABS").unwrap().policy, ArrayPolicy::Elementwise);
    }

    #[test]
    fn test_register_custom_function() {
        let mut registry = FunctionRegistry::new();
        let before = registry.len();
        registry.register(FunctionDef::new("TWICE", 1, Some(1), fn_twice).elementwise());
        assert_eq!(registry.len(), before + 1);

        let ctx = EvaluationContext::new(&EmptySource, CellAddress::new(0, 0))
            .with_registry(&registry);
        let ast = parse_formula("=twice({1,2})+1").unwrap();
        assert_eq!(
            evaluate_value(&ast, &ctx),
            FormulaValue::Array1D(vec![FormulaValue::Number(3.0), FormulaValue::Number(5.0)])
        );
    }

    #[test]
    fn test_argument_count_checked() {
        let ctx = EvaluationContext::new(&EmptySource, CellAddress::new(0, 0));
        for formula in ["=ABS()", "=ABS(1,2)", "=DSUM(1,2)", "=NA(1)"] {
            let ast = parse_formula(formula).unwrap();
            assert_eq!(
                evaluate_value(&ast, &ctx),
                FormulaValue::Error(ErrorKind::Value),
                "{}",
                formula
            );
        }
    }

    #[test]
    fn test_collect_numbers_skips_array_text() {
        let args = vec![
            FormulaValue::Number(1.0),
            FormulaValue::from("2"),
            FormulaValue::Array1D(vec![
                FormulaValue::Number(3.0),
                FormulaValue::from("4"),
                FormulaValue::Boolean(true),
                FormulaValue::Error(ErrorKind::NA),
            ]),
        ];
        assert_eq!(collect_numbers(&args).unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(collect_numbers(&[FormulaValue::from("x")]).is_err());
    }
}
