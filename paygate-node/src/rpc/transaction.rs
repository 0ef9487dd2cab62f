use std::sync::Arc;

use tonic::{Request, Response, Status};

use paygate_common::model;
use paygate_common::requests::{CreateTransactionRequest, UpdateTransactionRequest};
use paygate_services::{LedgerQueryService, LedgerStatsService, TransactionCommandService};

use super::convert;
use super::pb;
use super::pb::transaction_command_server::TransactionCommand;
use super::pb::transaction_query_server::TransactionQuery;
use super::pb::transaction_stats_server::TransactionStats;

pub struct TransactionQueryRpc {
    service: Arc<LedgerQueryService<model::Transaction>>,
}

impl TransactionQueryRpc {
    pub fn new(service: Arc<LedgerQueryService<model::Transaction>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TransactionQuery for TransactionQueryRpc {
    async fn find_all(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TransactionListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_all(filter).await?;
        Ok(Response::new(convert::transaction_list(page)))
    }

    async fn find_all_by_card_number(
        &self,
        request: Request<pb::CardNumberPageRequest>,
    ) -> Result<Response<pb::TransactionListReply>, Status> {
        let req = request.into_inner();
        let filter = convert::pagination(req.filter);
        let page = self
            .service
            .find_all_by_card_number(req.card_number, filter)
            .await?;
        Ok(Response::new(convert::transaction_list(page)))
    }

    async fn find_by_id(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TransactionReply>, Status> {
        let row = self.service.find_by_id(request.into_inner().id).await?;
        Ok(Response::new(pb::TransactionReply {
            transaction: Some(convert::transaction(&row)),
        }))
    }

    async fn find_by_active(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TransactionListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_active(filter).await?;
        Ok(Response::new(convert::transaction_list(page)))
    }

    async fn find_by_trashed(
        &self,
        request: Request<pb::Pagination>,
    ) -> Result<Response<pb::TransactionListReply>, Status> {
        let filter = convert::pagination(Some(request.into_inner()));
        let page = self.service.find_by_trashed(filter).await?;
        Ok(Response::new(convert::transaction_list(page)))
    }
}

pub struct TransactionCommandRpc {
    service: Arc<TransactionCommandService>,
}

impl TransactionCommandRpc {
    pub fn new(service: Arc<TransactionCommandService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TransactionCommand for TransactionCommandRpc {
    async fn create(
        &self,
        request: Request<pb::CreateTransactionRequest>,
    ) -> Result<Response<pb::TransactionReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .create(CreateTransactionRequest {
                card_number: req.card_number,
                amount: req.amount,
                payment_method: req.payment_method,
                merchant_id: req.merchant_id,
                transaction_time: req.transaction_time,
            })
            .await?;
        Ok(Response::new(pb::TransactionReply {
            transaction: Some(convert::transaction(&row)),
        }))
    }

    async fn update(
        &self,
        request: Request<pb::UpdateTransactionRequest>,
    ) -> Result<Response<pb::TransactionReply>, Status> {
        let req = request.into_inner();
        let row = self
            .service
            .update(UpdateTransactionRequest {
                id: req.id,
                card_number: req.card_number,
                amount: req.amount,
                payment_method: req.payment_method,
                merchant_id: req.merchant_id,
                transaction_time: req.transaction_time,
            })
            .await?;
        Ok(Response::new(pb::TransactionReply {
            transaction: Some(convert::transaction(&row)),
        }))
    }

    async fn trashed(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TransactionReply>, Status> {
        let row = self.service.trashed(request.into_inner().id).await?;
        Ok(Response::new(pb::TransactionReply {
            transaction: Some(convert::transaction(&row)),
        }))
    }

    async fn restore(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::TransactionReply>, Status> {
        let row = self.service.restore(request.into_inner().id).await?;
        Ok(Response::new(pb::TransactionReply {
            transaction: Some(convert::transaction(&row)),
        }))
    }

    async fn delete_permanent(
        &self,
        request: Request<pb::IdRequest>,
    ) -> Result<Response<pb::Empty>, Status> {
        self.service.delete_permanent(request.into_inner().id).await?;
        Ok(Response::new(pb::Empty {}))
    }

    async fn restore_all(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.restore_all().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }

    async fn delete_all_permanent(
        &self,
        _request: Request<pb::Empty>,
    ) -> Result<Response<pb::AffectedReply>, Status> {
        let affected = self.service.delete_all_permanent().await?;
        Ok(Response::new(pb::AffectedReply { affected }))
    }
}

pub struct TransactionStatsRpc {
    service: Arc<LedgerStatsService<model::Transaction>>,
}

impl TransactionStatsRpc {
    pub fn new(service: Arc<LedgerStatsService<model::Transaction>>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl TransactionStats for TransactionStatsRpc {
    async fn get_stats(
        &self,
        request: Request<pb::StatsRequest>,
    ) -> Result<Response<pb::StatsReply>, Status> {
        let query = convert::stats_query(request.into_inner()).map_err(Status::from)?;
        let series = self.service.get_stats(query).await?;
        Ok(Response::new(convert::stats_reply(series)))
    }
}
