// Common calling convention for wrapped functions.
//
// Every wrapper in this crate takes something that implements `Call` and is
// itself a `Call`, so layers stack in any order. Functions with more than one
// argument take a tuple.

pub trait Call<Args> {
    type Output;

    fn call(&self, args: Args) -> Self::Output;
}

impl<F, Args, R> Call<Args> for F
where
    F: Fn(Args) -> R,
{
    type Output = R;

    fn call(&self, args: Args) -> R {
        self(args)
    }
}
