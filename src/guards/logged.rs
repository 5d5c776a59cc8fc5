use tracing::warn;

use crate::call::Call;
use crate::error::DecoratorError;
use crate::guards::{Arg, TypeChecked};
use crate::metrics::REJECTIONS;

/// Log-and-drop adapter: a rejected call is logged, counted, and turned into
/// `None` instead of an error.
pub struct Logged<W> {
    inner: W,
}

impl<W> Logged<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn drop_failure<T>(outcome: Result<T, DecoratorError>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            REJECTIONS.with_label_values(&[err.kind()]).inc();
            warn!(kind = err.kind(), "{err}");
            None
        }
    }
}

impl<W, Args, T> Call<Args> for Logged<W>
where
    W: Call<Args, Output = Result<T, DecoratorError>>,
{
    type Output = Option<T>;

    fn call(&self, args: Args) -> Option<T> {
        drop_failure(self.inner.call(args))
    }
}

impl<F> Logged<TypeChecked<F>> {
    pub fn invoke<R>(&self, args: &[&dyn Arg]) -> Option<R>
    where
        F: Fn(&[&dyn Arg]) -> R,
    {
        drop_failure(self.inner.invoke(args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::{ErrorBoundary, RoleGuard, Signature, TypeValidator};

    #[test]
    fn test_success_is_some() {
        let logged = Logged::new(RoleGuard::admin().wrap("double", |x: u8| x * 2));
        assert_eq!(logged.call(("admin", 4)), Some(8));
    }

    #[test]
    fn test_failures_are_dropped() {
        let logged = Logged::new(RoleGuard::admin().wrap("double", |x: u8| x * 2));
        assert_eq!(logged.call(("user", 4)), None);

        let logged = Logged::new(ErrorBoundary::wrap("fail", |_: ()| -> Result<(), String> {
            Err("nope".into())
        }));
        assert_eq!(logged.call(()), None);
    }

    #[test]
    fn test_panics_inside_guards_are_dropped() {
        let role = Logged::new(RoleGuard::admin().wrap("lookup", |()| -> u32 { panic!("KeyError: 'key'") }));
        assert_eq!(role.call(("admin", ())), None);

        fn first(_: &[&dyn Arg]) -> u8 {
            panic!("index out of range")
        }
        let typed = Logged::new(TypeValidator::new(Signature::new("first").param::<u8>("x")).wrap(first));
        assert_eq!(typed.invoke(&[&7_u8]), None);
    }

    #[test]
    fn test_rejections_are_counted() {
        let before = REJECTIONS.with_label_values(&["type"]).get();
        let logged = Logged::new(
            TypeValidator::new(Signature::new("id").param::<u8>("x")).wrap(|_: &[&dyn Arg]| ()),
        );
        assert_eq!(logged.invoke(&[&"x"]), None);
        assert!(REJECTIONS.with_label_values(&["type"]).get() >= before + 1.0);
    }
}
