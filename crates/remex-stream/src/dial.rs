//! Connection establishment.
//!
//! Resolution goes through `getaddrinfo` so service names work as well as
//! numeric ports. Candidates are tried in resolution order; a connect
//! failure is reported only if every candidate fails.

use std::ffi::{CStr, CString};
use std::fmt::Display;
use std::io;
use std::mem;
use std::net::TcpStream;
use std::os::fd::FromRawFd;
use std::ptr;

use crate::NetError;

/// Connect to `host:service`, where `service` may be a numeric port or a
/// service name.
pub fn connect(host: &str, service: impl Display) -> Result<TcpStream, NetError> {
    connect_with(None, host, service)
}

/// Connect to a combined `"host:port"` string.
pub fn connect_addr(hostport: &str) -> Result<TcpStream, NetError> {
    let Some((host, service)) = hostport.rsplit_once(':') else {
        return Err(NetError::Resolve {
            host: hostport.to_string(),
            service: String::new(),
            reason: "no port in address".to_string(),
        });
    };
    connect_with(None, host, service)
}

/// Connect, optionally binding `local_addr` before the connect call.
pub fn connect_with(
    local_addr: Option<&str>,
    host: &str,
    service: impl Display,
) -> Result<TcpStream, NetError> {
    let service = service.to_string();
    let locals = match local_addr {
        Some(addr) => Some(AddrList::lookup(addr, "")?),
        None => None,
    };
    let remotes = AddrList::lookup(host, &service)?;

    let mut last = io::Error::from(io::ErrorKind::AddrNotAvailable);
    for ai in remotes.iter() {
        // 1. A socket of the candidate's family.
        let fd = unsafe { libc::socket(ai.ai_family, ai.ai_socktype, ai.ai_protocol) };
        if fd < 0 {
            last = io::Error::last_os_error();
            continue;
        }

        // 2. Bind a matching local candidate, if one was requested.
        if let Some(locals) = &locals {
            let mut bound = false;
            for la in locals.iter() {
                if la.ai_family == ai.ai_family
                    && la.ai_socktype == ai.ai_socktype
                    && la.ai_protocol == ai.ai_protocol
                    && unsafe { libc::bind(fd, la.ai_addr, la.ai_addrlen) } == 0
                {
                    bound = true;
                    break;
                }
            }
            if !bound {
                last = io::Error::last_os_error();
                unsafe { libc::close(fd) };
                continue;
            }
        }

        // 3. Connect; first success wins.
        if unsafe { libc::connect(fd, ai.ai_addr, ai.ai_addrlen) } == 0 {
            tracing::debug!(host, service, fd, "connected");
            return Ok(unsafe { TcpStream::from_raw_fd(fd) });
        }
        last = io::Error::last_os_error();
        unsafe { libc::close(fd) };
    }

    Err(NetError::Connect {
        host: host.to_string(),
        service,
        source: last,
    })
}

/// An owned `getaddrinfo` result chain.
struct AddrList {
    head: *mut libc::addrinfo,
}

impl AddrList {
    fn lookup(host: &str, service: &str) -> Result<AddrList, NetError> {
        let resolve_err = |reason: String| NetError::Resolve {
            host: host.to_string(),
            service: service.to_string(),
            reason,
        };

        let c_host = CString::new(host).map_err(|_| resolve_err("NUL in host".to_string()))?;
        let c_service =
            CString::new(service).map_err(|_| resolve_err("NUL in service".to_string()))?;

        let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
        hints.ai_family = libc::AF_UNSPEC;
        hints.ai_socktype = libc::SOCK_STREAM;

        let mut head: *mut libc::addrinfo = ptr::null_mut();
        let rc = unsafe {
            libc::getaddrinfo(
                if host.is_empty() {
                    ptr::null()
                } else {
                    c_host.as_ptr()
                },
                if service.is_empty() {
                    ptr::null()
                } else {
                    c_service.as_ptr()
                },
                &hints,
                &mut head,
            )
        };

        match rc {
            0 => Ok(AddrList { head }),
            libc::EAI_SYSTEM => Err(resolve_err(io::Error::last_os_error().to_string())),
            code => {
                let reason = unsafe { CStr::from_ptr(libc::gai_strerror(code)) };
                Err(resolve_err(reason.to_string_lossy().into_owned()))
            }
        }
    }

    fn iter(&self) -> AddrIter<'_> {
        AddrIter {
            cur: self.head,
            _list: self,
        }
    }
}

impl Drop for AddrList {
    fn drop(&mut self) {
        if !self.head.is_null() {
            unsafe { libc::freeaddrinfo(self.head) };
        }
    }
}

struct AddrIter<'a> {
    cur: *mut libc::addrinfo,
    _list: &'a AddrList,
}

impl<'a> Iterator for AddrIter<'a> {
    type Item = &'a libc::addrinfo;

    fn next(&mut self) -> Option<&'a libc::addrinfo> {
        if self.cur.is_null() {
            return None;
        }
        let out = unsafe { &*self.cur };
        self.cur = out.ai_next;
        Some(out)
    }
}
