use chrono::Utc;
use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    mailer::Mailer,
    model::{
        api::{
            admin::AdminCredentials,
            auth::{OtpRequest, VerifyOtpRequest},
            token::{AuthToken, AUTH_TOKEN_COOKIE},
        },
        db::{
            admin::Admin,
            settings::{self, NewSettings, Settings},
            voter::{self, Voter},
        },
        eligibility,
        mongodb::Coll,
        otp::Code,
    },
};

pub fn routes() -> Vec<Route> {
    routes![request_otp, verify_otp, authenticate_admin, logout]
}

/// Issue an OTP to the given email, creating the voter record lazily.
///
/// The eligibility gate runs before any state changes; a re-request simply
/// overwrites the previous code, so at most one code is live per voter.
#[post("/auth/request-otp", data = "<request>", format = "json")]
async fn request_otp(
    request: Json<OtpRequest>,
    voters: Coll<Voter>,
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
    config: &State<Config>,
    mailer: &State<Mailer>,
) -> Result<()> {
    let email = request.0.email;
    let now = Utc::now();
    let settings = settings::get_or_create(&settings, &new_settings).await?;

    // An absent voter record means they have not voted.
    let voter = voters.find_one(doc! { "email": email.clone() }, None).await?;
    let has_voted = voter.map(|voter| voter.has_voted).unwrap_or(false);
    eligibility::can_request_otp(&settings, has_voted, now)?;

    let code = Code::random();
    let expires_at = now + config.otp_ttl();
    voter::issue_otp(&voters, &email, &code, expires_at).await?;

    // A dispatch failure is reported to the caller as a failure even though
    // the code was stored; re-requesting is safe and overwrites it.
    mailer
        .send(
            &email,
            "Your voting OTP",
            format!("Your OTP for voting is: {code}"),
        )
        .await?;

    info!("OTP issued to {email}, expires at {expires_at}");
    Ok(())
}

/// Exchange an emailed code for a session credential. Verification consumes
/// the code whatever happens next; a second attempt with the same code fails.
#[post("/auth/verify-otp", data = "<request>", format = "json")]
async fn verify_otp(
    request: Json<VerifyOtpRequest>,
    voters: Coll<Voter>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<()> {
    let VerifyOtpRequest { email, code } = request.0;

    let voter = voter::consume_otp(&voters, email, &code, Utc::now())
        .await?
        // Deliberately indistinguishable: unknown voter, wrong code and
        // expired code all look the same to the caller.
        .ok_or(Error::InvalidOrExpiredOtp)?;

    let token = AuthToken::new(&voter);
    cookies.add(token.into_cookie(config));

    info!("OTP verified for {}", voter.email);
    Ok(())
}

/// Admin login with username and password.
#[post("/auth/admin", data = "<credentials>", format = "json")]
async fn authenticate_admin(
    credentials: Json<AdminCredentials>,
    admins: Coll<Admin>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<()> {
    let admin = admins
        .find_one(doc! { "username": &credentials.username }, None)
        .await?
        .filter(|admin| admin.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Unauthorized(
                "No admin found with the provided username and password combination.".to_string(),
            )
        })?;

    let token = AuthToken::new(&admin);
    cookies.add(token.into_cookie(config));

    Ok(())
}

#[delete("/auth")]
fn logout(cookies: &CookieJar<'_>) -> rocket::http::Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    rocket::http::Status::Ok
}
