use crate::call::Call;
use crate::error::DecoratorError;
use crate::guards::catch_panic;

/// Lets a call through only when the caller presents the required role.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    required: String,
}

impl RoleGuard {
    pub fn new(required: impl Into<String>) -> Self {
        Self {
            required: required.into(),
        }
    }

    /// Shorthand for the common `admin` check.
    pub fn admin() -> Self {
        Self::new("admin")
    }

    pub fn required(&self) -> &str {
        &self.required
    }

    pub fn check(&self, role: &str) -> Result<(), DecoratorError> {
        if role == self.required {
            Ok(())
        } else {
            Err(DecoratorError::PermissionDenied {
                required: self.required.clone(),
                actual: role.to_string(),
            })
        }
    }

    pub fn wrap<F>(&self, name: &str, func: F) -> RoleGuarded<F> {
        RoleGuarded {
            name: name.to_string(),
            guard: self.clone(),
            func,
        }
    }
}

/// Called with `(role, args)`. A panic in the wrapped function comes back as
/// [`DecoratorError::CallFailed`].
pub struct RoleGuarded<F> {
    name: String,
    guard: RoleGuard,
    func: F,
}

impl<F, S, Args> Call<(S, Args)> for RoleGuarded<F>
where
    F: Call<Args>,
    S: AsRef<str>,
{
    type Output = Result<F::Output, DecoratorError>;

    fn call(&self, (role, args): (S, Args)) -> Self::Output {
        self.guard.check(role.as_ref())?;
        catch_panic(&self.name, || self.func.call(args))
    }
}
