//! Declarative client binders.
//!
//! `net_client!` and `net_async_client!` turn a list of
//! `name(args) -> ret = "expr"` declarations into a typed client struct.
//! Construction dials (or adopts) a socket and runs the handshake with ids
//! numbered from 1 in declaration order; each declaration becomes one
//! typed method. `reconnect` repeats the handshake on a fresh socket,
//! `fd()` exposes the raw descriptor for external readiness selectors,
//! and dropping a client closes the socket and discards any pending
//! continuations.

/// Define a synchronous client: every call blocks until its reply is read.
///
/// ```ignore
/// net_client! {
///     pub client Calculator {
///         rpc add(x: i32, y: i32) -> i32 = "\\x y.x+y";
///         rpc flip(v: Vec<bool>) -> Vec<bool> = "reverse";
///     }
/// }
///
/// let mut calc = Calculator::connect("127.0.0.1", 8080)?;
/// assert_eq!(calc.add(1, 2)?, 3);
/// ```
#[macro_export]
macro_rules! net_client {
    ( $(#[$meta:meta])* $vis:vis client $cname:ident {
        $( rpc $name:ident ( $($arg:ident : $aty:ty),* $(,)? ) -> $ret:ty = $expr:expr ; )+
    } ) => {
        $(#[$meta])*
        $vis struct $cname {
            chan: $crate::SyncChannel,
        }

        impl $cname {
            /// The declaration list sent at handshake, ids numbered from 1
            /// in declaration order.
            pub fn rpc_defs() -> ::std::vec::Vec<$crate::RpcDef> {
                let mut defs = ::std::vec::Vec::new();
                $( defs.push($crate::rpc_def::<( $($aty,)* ), $ret>(
                    (defs.len() + 1) as u32,
                    $expr,
                )); )+
                defs
            }

            /// Adopt an already-connected socket and run the handshake.
            pub fn from_stream(
                sock: ::std::net::TcpStream,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                Ok(Self {
                    chan: $crate::SyncChannel::open(sock, &Self::rpc_defs())?,
                })
            }

            /// Dial `host:service` and run the handshake.
            pub fn connect(
                host: &str,
                service: impl ::core::fmt::Display,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                Self::from_stream($crate::connect(host, service)?)
            }

            /// Dial a combined `"host:port"` string.
            pub fn connect_addr(
                hostport: &str,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                Self::from_stream($crate::connect_addr(hostport)?)
            }

            /// Dial with a local address bound before connecting.
            pub fn connect_with(
                local_addr: ::core::option::Option<&str>,
                host: &str,
                service: impl ::core::fmt::Display,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                Self::from_stream($crate::connect_with(local_addr, host, service)?)
            }

            /// Redo the handshake on a fresh connected socket.
            pub fn reconnect_stream(
                &mut self,
                sock: ::std::net::TcpStream,
            ) -> ::core::result::Result<(), $crate::SessionError> {
                self.chan.reconnect(sock, &Self::rpc_defs())
            }

            /// Dial again and redo the handshake.
            pub fn reconnect(
                &mut self,
                host: &str,
                service: impl ::core::fmt::Display,
            ) -> ::core::result::Result<(), $crate::SessionError> {
                self.reconnect_stream($crate::connect(host, service)?)
            }

            /// True once a call has failed on this session.
            pub fn is_broken(&self) -> bool {
                self.chan.is_broken()
            }

            /// The socket descriptor, for external readiness selectors.
            pub fn fd(&self) -> ::std::os::fd::RawFd {
                self.chan.fd()
            }

            $crate::net_client!(@methods [] ;
                $( rpc $name ( $($arg : $aty),* ) -> $ret = $expr ; )+);
        }
    };

    (@methods [$($mark:tt)*] ;
        rpc $name:ident ( $($arg:ident : $aty:ty),* ) -> $ret:ty = $expr:expr ;
        $($rest:tt)*) => {
        pub fn $name(
            &mut self
            $(, $arg: $aty)*
        ) -> ::core::result::Result<$ret, $crate::SessionError> {
            self.chan.call::<( $($aty,)* ), $ret>((1u32 $(+ $mark)*), &( $($arg,)* ))
        }

        $crate::net_client!(@methods [$($mark)* 1u32] ; $($rest)*);
    };
    (@methods [$($mark:tt)*] ;) => {};
}

/// Define an asynchronous client: requests are written immediately and
/// replies are delivered to continuations, in issue order, as the owning
/// event loop calls `step()` on readable events.
///
/// `rpc oneway` declares a fire-and-forget call with no reply and no
/// scheduler entry.
///
/// ```ignore
/// net_async_client! {
///     pub client Feed {
///         rpc next(n: u32) -> Vec<String> = "take";
///         rpc oneway mark(pos: u64) = "setMark";
///     }
/// }
///
/// let mut feed = Feed::connect("127.0.0.1", 8080)?;
/// feed.next(10, |batch| println!("{batch:?}"))?;
/// // ... when feed.fd() is readable:
/// feed.step()?;
/// ```
#[macro_export]
macro_rules! net_async_client {
    ( $(#[$meta:meta])* $vis:vis client $cname:ident { $($body:tt)* } ) => {
        $crate::net_async_client!(@parse $(#[$meta])* $vis $cname [] $($body)*);
    };

    (@parse $(#[$meta:meta])* $vis:vis $cname:ident [$($item:tt)*]
        rpc oneway $name:ident ( $($arg:ident : $aty:ty),* $(,)? ) = $expr:expr ;
        $($rest:tt)*) => {
        $crate::net_async_client!(@parse $(#[$meta])* $vis $cname
            [$($item)* { cast $name ( $($arg : $aty),* ) ( () ) ( $crate::OnewayStub ) $expr }]
            $($rest)*);
    };
    (@parse $(#[$meta:meta])* $vis:vis $cname:ident [$($item:tt)*]
        rpc $name:ident ( $($arg:ident : $aty:ty),* $(,)? ) -> $ret:ty = $expr:expr ;
        $($rest:tt)*) => {
        $crate::net_async_client!(@parse $(#[$meta])* $vis $cname
            [$($item)* { call $name ( $($arg : $aty),* ) ( $ret ) ( $crate::AsyncStub<$ret> ) $expr }]
            $($rest)*);
    };

    (@parse $(#[$meta:meta])* $vis:vis $cname:ident
        [$({ $kind:ident $name:ident ( $($arg:ident : $aty:ty),* )
             ( $ret:ty ) ( $stubty:ty ) $expr:expr })+] ) => {
        $(#[$meta])*
        $vis struct $cname {
            /// Socket plus scheduler FIFO; public so stubs can be driven
            /// directly.
            pub session: $crate::AsyncSession,
            $( pub $name: $stubty, )+
        }

        impl $cname {
            /// The declaration list sent at handshake, ids numbered from 1
            /// in declaration order.
            pub fn rpc_defs() -> ::std::vec::Vec<$crate::RpcDef> {
                let mut defs = ::std::vec::Vec::new();
                $( defs.push($crate::rpc_def::<( $($aty,)* ), $ret>(
                    (defs.len() + 1) as u32,
                    $expr,
                )); )+
                defs
            }

            /// Adopt an already-connected socket and run the handshake.
            pub fn from_stream(
                mut sock: ::std::net::TcpStream,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                $crate::init_session(&mut sock, &Self::rpc_defs())?;
                let mut next_id: u32 = 0;
                Ok(Self {
                    session: $crate::AsyncSession::new(sock),
                    $( $name: {
                        next_id += 1;
                        <$stubty>::new(next_id)
                    }, )+
                })
            }

            /// Dial `host:service` and run the handshake.
            pub fn connect(
                host: &str,
                service: impl ::core::fmt::Display,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                Self::from_stream($crate::connect(host, service)?)
            }

            /// Dial a combined `"host:port"` string.
            pub fn connect_addr(
                hostport: &str,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                Self::from_stream($crate::connect_addr(hostport)?)
            }

            /// Dial with a local address bound before connecting.
            pub fn connect_with(
                local_addr: ::core::option::Option<&str>,
                host: &str,
                service: impl ::core::fmt::Display,
            ) -> ::core::result::Result<Self, $crate::SessionError> {
                Self::from_stream($crate::connect_with(local_addr, host, service)?)
            }

            /// Redo the handshake on a fresh socket; pending continuations
            /// are discarded.
            pub fn reconnect_stream(
                &mut self,
                mut sock: ::std::net::TcpStream,
            ) -> ::core::result::Result<(), $crate::SessionError> {
                $crate::init_session(&mut sock, &Self::rpc_defs())?;
                self.session.reset(sock);
                $( self.$name.reset(); )+
                Ok(())
            }

            /// Dial again and redo the handshake.
            pub fn reconnect(
                &mut self,
                host: &str,
                service: impl ::core::fmt::Display,
            ) -> ::core::result::Result<(), $crate::SessionError> {
                self.reconnect_stream($crate::connect(host, service)?)
            }

            /// Drain completed replies head-first. Call whenever the
            /// socket is readable; stops at the first reply that is still
            /// incomplete.
            pub fn step(&mut self) -> ::core::result::Result<(), $crate::SessionError> {
                if self.session.is_broken() {
                    return Err($crate::SessionError::Broken);
                }
                loop {
                    let Some(id) = self.session.head() else {
                        return Ok(());
                    };
                    let mut next: u32 = 0;
                    let mut outcome: ::core::option::Option<
                        ::core::result::Result<bool, $crate::NetError>,
                    > = ::core::option::Option::None;
                    $( $crate::__remex_step_arm!($kind, self, $name, id, next, outcome); )+
                    let _ = next;
                    match outcome {
                        ::core::option::Option::Some(Ok(true)) => self.session.pop_head(),
                        ::core::option::Option::Some(Ok(false)) => return Ok(()),
                        ::core::option::Option::Some(Err(e)) => {
                            self.session.mark_broken();
                            $crate::tracing::warn!(error = %e, "reply read failed, session broken");
                            return Err($crate::SessionError::Net(e));
                        }
                        ::core::option::Option::None => return Ok(()),
                    }
                }
            }

            /// Replies not yet delivered to their continuations.
            pub fn pending_requests(&self) -> usize {
                self.session.pending_requests()
            }

            /// True once the session has failed.
            pub fn is_broken(&self) -> bool {
                self.session.is_broken()
            }

            /// The socket descriptor, for external readiness selectors.
            pub fn fd(&self) -> ::std::os::fd::RawFd {
                self.session.fd()
            }

            $( $crate::__remex_stub_method!($kind, $name, ( $($arg : $aty),* ), $ret); )+
        }
    };
}

/// One arm of the generated `step()` dispatch. Not part of the public API.
#[doc(hidden)]
#[macro_export]
macro_rules! __remex_step_arm {
    (call, $this:ident, $name:ident, $id:ident, $next:ident, $outcome:ident) => {
        $next += 1;
        if $outcome.is_none() && $id == $next {
            let sock = $this.session.sock_mut();
            $outcome = ::core::option::Option::Some($this.$name.read_and_finish(sock));
        }
    };
    (cast, $this:ident, $name:ident, $id:ident, $next:ident, $outcome:ident) => {
        $next += 1;
    };
}

/// One generated stub method. Not part of the public API.
#[doc(hidden)]
#[macro_export]
macro_rules! __remex_stub_method {
    (call, $name:ident, ( $($arg:ident : $aty:ty),* ), $ret:ty) => {
        pub fn $name(
            &mut self,
            $($arg: $aty,)*
            k: impl ::core::ops::FnOnce($ret) + 'static,
        ) -> ::core::result::Result<(), $crate::SessionError> {
            self.$name.call(&mut self.session, &( $($arg,)* ), k)
        }
    };
    (cast, $name:ident, ( $($arg:ident : $aty:ty),* ), $ret:ty) => {
        pub fn $name(
            &mut self
            $(, $arg: $aty)*
        ) -> ::core::result::Result<(), $crate::SessionError> {
            self.$name.call(&mut self.session, &( $($arg,)* ))
        }
    };
}
