//! Code generation for fixed-width field codecs and typed element access.

/// Generates `put_<ty>` on `FieldWriter<W>` and `take_<ty>` on
/// `FieldReader<R>`, each honouring the stream's byte order.
macro_rules! impl_field_codec {
    ($($ty:ident),+ $(,)?) => {
        paste::paste! {
            impl<W: std::io::Write> FieldWriter<W> {
                $(
                    #[doc = concat!("Writes a `", stringify!($ty), "` in the stream byte order.")]
                    pub fn [<put_ $ty>](&mut self, value: $ty) -> PersistResult<()> {
                        let bytes = match self.endian {
                            Endian::Little => value.to_le_bytes(),
                            Endian::Big => value.to_be_bytes(),
                        };
                        self.put_bytes(&bytes)
                    }
                )+
            }

            impl<R: std::io::Read> FieldReader<R> {
                $(
                    #[doc = concat!("Reads a `", stringify!($ty), "` in the stream byte order.")]
                    pub fn [<take_ $ty>](&mut self) -> PersistResult<$ty> {
                        let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                        self.take_exact(&mut bytes)?;
                        Ok(match self.endian {
                            Endian::Little => $ty::from_le_bytes(bytes),
                            Endian::Big => $ty::from_be_bytes(bytes),
                        })
                    }
                )+
            }
        }
    };
}

/// Generates `get_<ty>` and `put_<ty>` element accessors on a container
/// exposing `elem_size()`, `get(index, &mut [u8])` and `put(index, &[u8])`.
///
/// Values travel in native byte order and the container's element size must
/// equal the width of the type.
macro_rules! impl_typed_accessors {
    ($container:ident: $($ty:ident),+ $(,)?) => {
        paste::paste! {
            impl $container {
                fn check_width(&self, operation: &str, width: usize) -> ContainerResult<()> {
                    if self.elem_size() != width {
                        return Err(ContainerError::invalid_argument(
                            operation,
                            &format!(
                                "element size is {} bytes, accessor is {} bytes",
                                self.elem_size(),
                                width
                            ),
                        ));
                    }
                    Ok(())
                }

                $(
                    #[doc = concat!(
                        "Reads the element at `index` as a native-endian `",
                        stringify!($ty),
                        "`."
                    )]
                    pub fn [<get_ $ty>](&mut self, index: u64) -> ContainerResult<$ty> {
                        let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                        self.check_width(concat!("get_", stringify!($ty)), bytes.len())?;
                        self.get(index, &mut bytes)?;
                        Ok($ty::from_ne_bytes(bytes))
                    }

                    #[doc = concat!(
                        "Writes `value` at `index` as a native-endian `",
                        stringify!($ty),
                        "`."
                    )]
                    pub fn [<put_ $ty>](&mut self, index: u64, value: $ty) -> ContainerResult<()> {
                        let bytes = value.to_ne_bytes();
                        self.check_width(concat!("put_", stringify!($ty)), bytes.len())?;
                        self.put(index, &bytes)
                    }
                )+
            }
        }
    };
}
