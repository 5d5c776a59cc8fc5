// Exact runtime type checks against a declared signature.
// Arguments are compared by TypeId, so there is no coercion (an i32 is not an i64).

use std::any::{Any, TypeId, type_name};

use crate::call::Call;
use crate::error::{DecoratorError, Mismatch};
use crate::guards::catch_panic;

pub trait Arg: Any {
    fn arg_type_id(&self) -> TypeId;
    fn arg_type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> Arg for T {
    fn arg_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn arg_type_name(&self) -> &'static str {
        short_type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// "alloc::string::String" -> "String", "core::option::Option<i64>" -> "Option<i64>"
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

/// Declared parameter list of a function. The return type is recorded but
/// not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    function: String,
    params: Vec<Param>,
    returns: Option<&'static str>,
}

impl Signature {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            params: Vec::new(),
            returns: None,
        }
    }

    pub fn param<T: Any>(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: short_type_name::<T>(),
        });
        self
    }

    pub fn returns<T: Any>(mut self) -> Self {
        self.returns = Some(short_type_name::<T>());
        self
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn return_type(&self) -> Option<&'static str> {
        self.returns
    }

    // reports every mismatched argument at once
    pub fn check(&self, args: &[&dyn Arg]) -> Result<(), DecoratorError> {
        if args.len() != self.params.len() {
            return Err(DecoratorError::ArityMismatch {
                function: self.function.clone(),
                expected: self.params.len(),
                actual: args.len(),
            });
        }

        let mismatches: Vec<Mismatch> = self
            .params
            .iter()
            .zip(args.iter().copied())
            .filter_map(|(param, arg)| check_param(param, arg))
            .collect();

        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(DecoratorError::TypeMismatch {
                function: self.function.clone(),
                mismatches,
            })
        }
    }
}

fn check_param(param: &Param, arg: &dyn Arg) -> Option<Mismatch> {
    if arg.arg_type_id() == param.type_id {
        return None;
    }
    Some(Mismatch {
        name: param.name.clone(),
        expected: param.type_name,
        actual: arg.arg_type_name(),
    })
}

#[derive(Debug, Clone)]
pub struct TypeValidator {
    signature: Signature,
}

impl TypeValidator {
    pub fn new(signature: Signature) -> Self {
        Self { signature }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// `func` receives the arguments only after they pass the check, so it
    /// may downcast them with [`Arg::as_any`].
    pub fn wrap<F>(&self, func: F) -> TypeChecked<F> {
        TypeChecked {
            signature: self.signature.clone(),
            func,
        }
    }
}

pub struct TypeChecked<F> {
    signature: Signature,
    func: F,
}

impl<F> TypeChecked<F> {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    // check args, then run the wrapped function; a panic comes back as CallFailed
    pub fn invoke<R>(&self, args: &[&dyn Arg]) -> Result<R, DecoratorError>
    where
        F: Fn(&[&dyn Arg]) -> R,
    {
        self.signature.check(args)?;
        catch_panic(&self.signature.function, || (self.func)(args))
    }
}

impl<'a, F, R> Call<&'a [&'a dyn Arg]> for TypeChecked<F>
where
    F: Fn(&[&dyn Arg]) -> R,
{
    type Output = Result<R, DecoratorError>;

    fn call(&self, args: &'a [&'a dyn Arg]) -> Self::Output {
        self.invoke(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_signature() -> Signature {
        Signature::new("add")
            .param::<i64>("a")
            .param::<i64>("b")
            .returns::<i64>()
    }

    fn add(args: &[&dyn Arg]) -> i64 {
        let a = args[0].as_any().downcast_ref::<i64>().copied().unwrap_or_default();
        let b = args[1].as_any().downcast_ref::<i64>().copied().unwrap_or_default();
        a + b
    }

    #[test]
    fn test_short_type_names() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<i64>(), "i64");
        assert_eq!(short_type_name::<Option<i64>>(), "Option<i64>");
    }

    #[test]
    fn test_matching_args_run() {
        let checked = TypeValidator::new(add_signature()).wrap(add);
        assert_eq!(checked.invoke(&[&2_i64, &2_i64]), Ok(4));
    }

    #[test]
    fn test_float_is_not_an_integer() {
        let checked = TypeValidator::new(add_signature()).wrap(add);
        let err = checked.invoke(&[&1_i64, &2.0_f64]).unwrap_err();
        assert_eq!(
            err,
            DecoratorError::TypeMismatch {
                function: "add".into(),
                mismatches: vec![Mismatch { name: "b".into(), expected: "i64", actual: "f64" }],
            }
        );
    }

    #[test]
    fn test_every_mismatch_is_reported() {
        let checked = TypeValidator::new(add_signature()).wrap(add);
        let err = checked.invoke(&[&"2".to_string(), &2.0_f64]).unwrap_err();
        let DecoratorError::TypeMismatch { mismatches, .. } = err else {
            panic!("expected a type mismatch");
        };
        let found: Vec<_> = mismatches
            .iter()
            .map(|m| (m.name.as_str(), m.expected, m.actual))
            .collect();
        assert_eq!(found, vec![("a", "i64", "String"), ("b", "i64", "f64")]);
    }

    #[test]
    fn test_no_subtype_leniency() {
        let sig = Signature::new("flag").param::<i64>("x");
        assert!(sig.check(&[&true]).is_err());
        assert!(sig.check(&[&1_i32]).is_err());
        assert!(sig.check(&[&1_i64]).is_ok());
    }

    #[test]
    fn test_wrong_arity() {
        let err = add_signature().check(&[&1_i64]).unwrap_err();
        assert_eq!(
            err,
            DecoratorError::ArityMismatch { function: "add".into(), expected: 2, actual: 1 }
        );
    }

    #[test]
    fn test_panic_after_check_is_caught() {
        fn boom(_: &[&dyn Arg]) -> i64 {
            panic!("overflow")
        }
        let checked = TypeValidator::new(Signature::new("boom").param::<i64>("x")).wrap(boom);
        let err = checked.invoke(&[&1_i64]).unwrap_err();
        assert_eq!(err.kind(), "runtime");
        assert_eq!(err.to_string(), "Found error(s) during execution of boom: panicked: overflow");
    }

    #[test]
    fn test_return_type_is_recorded_only() {
        assert_eq!(add_signature().return_type(), Some("i64"));
    }
}
