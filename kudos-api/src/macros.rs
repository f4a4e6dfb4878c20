/// Chainable setters that write into a request's nested payload.
///
/// ```ignore
/// setters!(student {
///     department_id: ObjectId,
/// } optional {
///     middle_name: String,
/// });
/// ```
///
/// Fields listed under `optional` are `Option`s and get wrapped in `Some`.
macro_rules! setters {
    (
        $payload:ident { $($field:ident : $ty:ty),* $(,)? }
        $(optional { $($opt_field:ident : $opt_ty:ty),* $(,)? })?
    ) => {
        $(
            pub fn $field<T>(mut self, $field: T) -> Self
            where
                T: Into<$ty>,
            {
                self.$payload.$field = $field.into();
                self
            }
        )*

        $($(
            pub fn $opt_field<T>(mut self, $opt_field: T) -> Self
            where
                T: Into<$opt_ty>,
            {
                self.$payload.$opt_field = std::option::Option::Some($opt_field.into());
                self
            }
        )*)?
    };
}

pub(crate) use setters;
