// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound provider clients. Each sits behind a trait so request handling
//! can run against in-process fakes.

pub mod resend;
pub mod s3;
pub mod stripe;

pub use resend::{EmailMessage, Mailer, MailerError, ResendMailer, SentEmail};
pub use s3::{DownloadUrlMinter, PresignError, S3Presigner, SignedDownloadUrl};
pub use stripe::{
    CheckoutError, CheckoutGateway, CheckoutSession, CheckoutUrls, PaymentIntent, StripeClient,
};
