//! Kitbag Admin CLI
//!
//! Provisioning for the collaborator surfaces the API does not expose:
//! customers (with API tokens), addresses, products and stock, coupons,
//! and wallet top-ups.

use std::process;

use clap::{Args, Parser, Subcommand};
use jiff::Timestamp;
use uuid::Uuid;

use kitbag_app::{
    auth::token::{generate_api_token, hash_api_token},
    database,
    domain::{
        catalog::{
            CatalogService, PgCatalogService,
            models::{NewProduct, ProductUuid},
        },
        coupons::{
            CouponsService, PgCouponsService,
            models::{CouponUuid, NewCoupon},
        },
        customers::{
            CustomersService, PgCustomersService,
            models::{AddressUuid, CustomerUuid, NewAddress, NewCustomer},
        },
        pricing::models::CouponKind,
        wallet::{PgWalletService, WalletService},
    },
};

#[derive(Debug, Parser)]
#[command(name = "kitbag-app", about = "Kitbag admin CLI", long_about = None)]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Customer(CustomerCommand),
    Address(AddressCommand),
    Product(ProductCommand),
    Stock(StockCommand),
    Coupon(CouponCommand),
    Wallet(WalletCommand),
}

#[derive(Debug, Args)]
struct CustomerCommand {
    #[command(subcommand)]
    command: CustomerSubcommand,
}

#[derive(Debug, Subcommand)]
enum CustomerSubcommand {
    Create(CreateCustomerArgs),
}

#[derive(Debug, Args)]
struct CreateCustomerArgs {
    /// Customer display name
    #[arg(long)]
    name: String,

    /// Grant admin privileges
    #[arg(long)]
    admin: bool,

    /// Optional customer UUID; generated when omitted
    #[arg(long)]
    customer_uuid: Option<Uuid>,

    /// Optional raw API token; generated when omitted
    #[arg(long)]
    token: Option<String>,
}

#[derive(Debug, Args)]
struct AddressCommand {
    #[command(subcommand)]
    command: AddressSubcommand,
}

#[derive(Debug, Subcommand)]
enum AddressSubcommand {
    Create(CreateAddressArgs),
}

#[derive(Debug, Args)]
struct CreateAddressArgs {
    #[arg(long)]
    customer_uuid: Uuid,

    #[arg(long)]
    recipient: String,

    #[arg(long)]
    line1: String,

    #[arg(long)]
    line2: Option<String>,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    #[arg(long)]
    postal_code: String,

    #[arg(long)]
    phone: String,
}

#[derive(Debug, Args)]
struct ProductCommand {
    #[command(subcommand)]
    command: ProductSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductSubcommand {
    Create(CreateProductArgs),
}

#[derive(Debug, Args)]
struct CreateProductArgs {
    /// Product display name
    #[arg(long)]
    name: String,

    /// List price, minor currency units
    #[arg(long)]
    list_price: u64,

    /// Sale price, minor currency units
    #[arg(long)]
    sale_price: u64,

    /// Seasonal offer percentage
    #[arg(long)]
    offer_pct: Option<u8>,

    /// Initial stock as SIZE=COUNT, repeatable (e.g. --size M=10)
    #[arg(long = "size", value_parser = parse_size_stock)]
    sizes: Vec<(String, u64)>,
}

#[derive(Debug, Args)]
struct StockCommand {
    #[command(subcommand)]
    command: StockSubcommand,
}

#[derive(Debug, Subcommand)]
enum StockSubcommand {
    Set(SetStockArgs),
}

#[derive(Debug, Args)]
struct SetStockArgs {
    #[arg(long)]
    product_uuid: Uuid,

    #[arg(long)]
    size: String,

    #[arg(long)]
    stock: u64,
}

#[derive(Debug, Args)]
struct CouponCommand {
    #[command(subcommand)]
    command: CouponSubcommand,
}

#[derive(Debug, Subcommand)]
enum CouponSubcommand {
    Create(CreateCouponArgs),
}

#[derive(Debug, Args)]
struct CreateCouponArgs {
    /// Coupon code (stored uppercase)
    #[arg(long)]
    code: String,

    /// "fixed" or "percentage"
    #[arg(long)]
    kind: String,

    /// Fixed amount (minor units) or percentage
    #[arg(long)]
    value: u64,

    /// Minimum purchase value, minor units
    #[arg(long, default_value_t = 0)]
    min_purchase: u64,

    /// Discount cap for percentage coupons, minor units
    #[arg(long)]
    max_discount: Option<u64>,

    /// Global redemption budget
    #[arg(long)]
    usage_limit: Option<u32>,

    /// Redemptions allowed per customer
    #[arg(long, default_value_t = 1)]
    per_user_limit: u32,

    /// Validity window start (RFC 3339); now when omitted
    #[arg(long)]
    starts_at: Option<Timestamp>,

    /// Validity window end (RFC 3339)
    #[arg(long)]
    expires_at: Timestamp,
}

#[derive(Debug, Args)]
struct WalletCommand {
    #[command(subcommand)]
    command: WalletSubcommand,
}

#[derive(Debug, Subcommand)]
enum WalletSubcommand {
    TopUp(TopUpArgs),
}

#[derive(Debug, Args)]
struct TopUpArgs {
    #[arg(long)]
    customer_uuid: Uuid,

    /// Amount to credit, minor currency units
    #[arg(long)]
    amount: u64,
}

fn parse_size_stock(value: &str) -> Result<(String, u64), String> {
    let (size, count) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SIZE=COUNT, got {value:?}"))?;

    let count: u64 = count
        .parse()
        .map_err(|_ignored| format!("invalid stock count in {value:?}"))?;

    if size.is_empty() {
        return Err(format!("empty size in {value:?}"));
    }

    Ok((size.to_string(), count))
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let database_url = cli
        .database_url
        .ok_or_else(|| "DATABASE_URL is not set".to_string())?;

    let pool = database::connect(&database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let db = kitbag_app::database::Db::new(pool);

    match cli.command {
        Commands::Customer(CustomerCommand {
            command: CustomerSubcommand::Create(args),
        }) => create_customer(db, args).await,
        Commands::Address(AddressCommand {
            command: AddressSubcommand::Create(args),
        }) => create_address(db, args).await,
        Commands::Product(ProductCommand {
            command: ProductSubcommand::Create(args),
        }) => create_product(db, args).await,
        Commands::Stock(StockCommand {
            command: StockSubcommand::Set(args),
        }) => set_stock(db, args).await,
        Commands::Coupon(CouponCommand {
            command: CouponSubcommand::Create(args),
        }) => create_coupon(db, args).await,
        Commands::Wallet(WalletCommand {
            command: WalletSubcommand::TopUp(args),
        }) => top_up_wallet(db, args).await,
    }
}

async fn create_customer(db: kitbag_app::database::Db, args: CreateCustomerArgs) -> Result<(), String> {
    let service = PgCustomersService::new(db);
    let customer_uuid = args.customer_uuid.unwrap_or_else(Uuid::now_v7);
    let raw_token = args.token.unwrap_or_else(generate_api_token);

    if raw_token.trim().is_empty() {
        return Err("token cannot be empty".to_string());
    }

    let customer = service
        .create_customer(NewCustomer {
            uuid: CustomerUuid::from_uuid(customer_uuid),
            name: args.name,
            token_hash: hash_api_token(&raw_token),
            is_admin: args.admin,
        })
        .await
        .map_err(|error| format!("failed to create customer: {error}"))?;

    println!("customer_uuid: {}", customer.uuid);
    println!("customer_name: {}", customer.name);
    println!("api_token: {raw_token}");
    println!("store this token now; it is only shown once");

    Ok(())
}

async fn create_address(db: kitbag_app::database::Db, args: CreateAddressArgs) -> Result<(), String> {
    let service = PgCustomersService::new(db);

    let address = service
        .create_address(NewAddress {
            uuid: AddressUuid::generate(),
            customer_uuid: CustomerUuid::from_uuid(args.customer_uuid),
            recipient: args.recipient,
            line1: args.line1,
            line2: args.line2,
            city: args.city,
            state: args.state,
            postal_code: args.postal_code,
            phone: args.phone,
        })
        .await
        .map_err(|error| format!("failed to create address: {error}"))?;

    println!("address_uuid: {}", address.uuid);

    Ok(())
}

async fn create_product(db: kitbag_app::database::Db, args: CreateProductArgs) -> Result<(), String> {
    let service = PgCatalogService::new(db);

    let product = service
        .create_product(NewProduct {
            uuid: ProductUuid::generate(),
            name: args.name,
            list_price: args.list_price,
            sale_price: args.sale_price,
            offer_pct: args.offer_pct,
        })
        .await
        .map_err(|error| format!("failed to create product: {error}"))?;

    for (size, stock) in &args.sizes {
        service
            .set_stock(product.uuid, size, *stock)
            .await
            .map_err(|error| format!("failed to set stock for {size}: {error}"))?;
    }

    println!("product_uuid: {}", product.uuid);

    Ok(())
}

async fn set_stock(db: kitbag_app::database::Db, args: SetStockArgs) -> Result<(), String> {
    let service = PgCatalogService::new(db);

    service
        .set_stock(ProductUuid::from_uuid(args.product_uuid), &args.size, args.stock)
        .await
        .map_err(|error| format!("failed to set stock: {error}"))?;

    println!("stock set: {} {} = {}", args.product_uuid, args.size, args.stock);

    Ok(())
}

async fn create_coupon(db: kitbag_app::database::Db, args: CreateCouponArgs) -> Result<(), String> {
    let kind = match args.kind.to_lowercase().as_str() {
        "fixed" => CouponKind::Fixed,
        "percentage" => CouponKind::Percentage,
        other => return Err(format!("unknown coupon kind {other:?}")),
    };

    let service = PgCouponsService::new(db);

    let coupon = service
        .create_coupon(NewCoupon {
            uuid: CouponUuid::generate(),
            code: args.code,
            kind,
            value: args.value,
            min_purchase: args.min_purchase,
            max_discount: args.max_discount,
            usage_limit: args.usage_limit,
            per_user_limit: args.per_user_limit,
            starts_at: args.starts_at.unwrap_or_else(Timestamp::now),
            expires_at: args.expires_at,
        })
        .await
        .map_err(|error| format!("failed to create coupon: {error}"))?;

    println!("coupon_uuid: {}", coupon.uuid);
    println!("coupon_code: {}", coupon.code);

    Ok(())
}

async fn top_up_wallet(db: kitbag_app::database::Db, args: TopUpArgs) -> Result<(), String> {
    let service = PgWalletService::new(db);

    let transaction = service
        .top_up(CustomerUuid::from_uuid(args.customer_uuid), args.amount)
        .await
        .map_err(|error| format!("failed to top up wallet: {error}"))?;

    println!("transaction_uuid: {}", transaction.uuid);
    println!("amount: {}", transaction.amount);

    Ok(())
}
