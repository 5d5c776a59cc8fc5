use std::fmt::Display;

use crate::call::Call;
use crate::error::DecoratorError;
use crate::guards::catch_panic;

// Every failure of the wrapped function, returned Err or panic, becomes CallFailed
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorBoundary;

impl ErrorBoundary {
    pub fn wrap<F>(name: &str, func: F) -> Bounded<F> {
        Bounded {
            name: name.to_string(),
            func,
        }
    }
}

pub struct Bounded<F> {
    name: String,
    func: F,
}

impl<F, Args, T, E> Call<Args> for Bounded<F>
where
    F: Call<Args, Output = Result<T, E>>,
    E: Display,
{
    type Output = Result<T, DecoratorError>;

    fn call(&self, args: Args) -> Self::Output {
        catch_panic(&self.name, || self.func.call(args))?.map_err(|err| {
            DecoratorError::CallFailed {
                function: self.name.clone(),
                message: err.to_string(),
            }
        })
    }
}
